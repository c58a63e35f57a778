//! In-memory tracking store

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::{ArtifactEntry, ExperimentRecord, RunPage, RunRecord, RunStatus, TrackingStore};
use crate::{Error, Result};

/// In-memory tracking store.
///
/// Experiments and runs live in hash maps keyed by id; artifact files are
/// byte blobs keyed by run id and relative path. Run search is ordered by
/// run id so pagination is stable across pages of one export.
#[derive(Debug)]
pub struct MemoryStore {
    experiments: DashMap<String, ExperimentRecord>,
    runs: DashMap<String, RunRecord>,
    artifacts: DashMap<String, BTreeMap<String, Vec<u8>>>,
    next_experiment_id: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            experiments: DashMap::new(),
            runs: DashMap::new(),
            artifacts: DashMap::new(),
            next_experiment_id: AtomicU64::new(1),
        }
    }

    /// Number of runs in the store, in any lifecycle stage.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Fetch a run by id, cloned out of the store.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.get(run_id).map(|r| r.value().clone())
    }

    /// Insert a fully formed run, replacing any existing one with the same
    /// id. Intended for seeding test fixtures.
    pub fn put_run(&self, run: RunRecord) {
        self.runs.insert(run.run_id().to_string(), run);
    }

    /// Store an artifact blob directly under a run. Intended for seeding
    /// test fixtures.
    pub fn put_artifact(&self, run_id: &str, path: impl Into<String>, bytes: Vec<u8>) {
        self.artifacts
            .entry(run_id.to_string())
            .or_default()
            .insert(path.into(), bytes);
    }

    /// Fetch an artifact blob, cloned out of the store.
    #[must_use]
    pub fn get_artifact(&self, run_id: &str, path: &str) -> Option<Vec<u8>> {
        self.artifacts
            .get(run_id)
            .and_then(|files| files.get(path).cloned())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingStore for MemoryStore {
    fn experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>> {
        Ok(self
            .experiments
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.value().clone()))
    }

    fn experiment_by_id(&self, experiment_id: &str) -> Result<Option<ExperimentRecord>> {
        Ok(self
            .experiments
            .get(experiment_id)
            .map(|e| e.value().clone()))
    }

    fn list_experiments(&self) -> Result<Vec<ExperimentRecord>> {
        let mut experiments: Vec<ExperimentRecord> =
            self.experiments.iter().map(|e| e.value().clone()).collect();
        experiments.sort_by(|a, b| a.experiment_id().cmp(b.experiment_id()));
        Ok(experiments)
    }

    fn create_experiment(&self, name: &str) -> Result<ExperimentRecord> {
        if self.experiment_by_name(name)?.is_some() {
            return Err(Error::Store(format!("experiment '{name}' already exists")));
        }
        let id = self
            .next_experiment_id
            .fetch_add(1, Ordering::SeqCst)
            .to_string();
        let experiment = ExperimentRecord::new(id.clone(), name);
        self.experiments.insert(id, experiment.clone());
        Ok(experiment)
    }

    fn delete_experiment(&self, experiment_id: &str) -> Result<()> {
        let mut experiment = self
            .experiments
            .get_mut(experiment_id)
            .ok_or_else(|| Error::Store(format!("experiment '{experiment_id}' not found")))?;
        experiment.delete();
        Ok(())
    }

    fn restore_experiment(&self, experiment_id: &str) -> Result<()> {
        let mut experiment = self
            .experiments
            .get_mut(experiment_id)
            .ok_or_else(|| Error::Store(format!("experiment '{experiment_id}' not found")))?;
        experiment.restore();
        Ok(())
    }

    fn search_runs(
        &self,
        experiment_id: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<RunPage> {
        let mut matching: Vec<RunRecord> = self
            .runs
            .iter()
            .filter(|r| {
                r.experiment_id() == experiment_id
                    && r.lifecycle_stage() == super::LifecycleStage::Active
            })
            .map(|r| r.value().clone())
            .collect();
        matching.sort_by(|a, b| a.run_id().cmp(b.run_id()));

        let offset = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::Store(format!("invalid page token '{token}'")))?,
        };
        let end = (offset + max_results).min(matching.len());
        let next_page_token = (end < matching.len()).then(|| end.to_string());
        let runs = matching
            .get(offset..end)
            .map(<[RunRecord]>::to_vec)
            .unwrap_or_default();
        Ok(RunPage::new(runs, next_page_token))
    }

    fn create_run(&self, experiment_id: &str, user_id: &str) -> Result<RunRecord> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(Error::Store(format!(
                "experiment '{experiment_id}' not found"
            )));
        }
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let run = RunRecord::new(run_id.clone(), experiment_id, user_id);
        self.runs.insert(run_id, run.clone());
        Ok(run)
    }

    fn delete_run(&self, run_id: &str) -> Result<()> {
        let mut run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        run.delete();
        Ok(())
    }

    fn log_batch(
        &self,
        run_id: &str,
        params: &BTreeMap<String, String>,
        metrics: &BTreeMap<String, f64>,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        for (name, value) in params {
            run.log_param(name.clone(), value.clone())?;
        }
        for (name, value) in metrics {
            run.log_metric(name.clone(), *value);
        }
        for (name, value) in tags {
            run.set_tag(name.clone(), value.clone());
        }
        Ok(())
    }

    fn terminate_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        run.terminate(status);
        Ok(())
    }

    fn list_artifacts(&self, run_id: &str, path: Option<&str>) -> Result<Vec<ArtifactEntry>> {
        if !self.runs.contains_key(run_id) {
            return Err(Error::RunNotFound(run_id.to_string()));
        }
        let Some(files) = self.artifacts.get(run_id) else {
            return Ok(Vec::new());
        };
        let prefix = path.map(|p| format!("{p}/")).unwrap_or_default();

        let mut entries = Vec::new();
        let mut seen_dirs = Vec::new();
        for (file_path, bytes) in files.iter() {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                // Deeper levels collapse into one directory entry
                Some((dir, _)) => {
                    let dir_path = format!("{prefix}{dir}");
                    if !seen_dirs.contains(&dir_path) {
                        seen_dirs.push(dir_path.clone());
                        entries.push(ArtifactEntry::dir(dir_path));
                    }
                }
                None => {
                    entries.push(ArtifactEntry::file(file_path.clone(), bytes.len() as u64));
                }
            }
        }
        Ok(entries)
    }

    fn download_artifact(&self, run_id: &str, artifact_path: &str, dest: &Path) -> Result<()> {
        let bytes = self.get_artifact(run_id, artifact_path).ok_or_else(|| {
            Error::Store(format!("run '{run_id}' has no artifact '{artifact_path}'"))
        })?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, bytes)?;
        Ok(())
    }

    fn upload_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        if !self.runs.contains_key(run_id) {
            return Err(Error::RunNotFound(run_id.to_string()));
        }
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::Store(format!("invalid artifact source path {}", local_path.display()))
            })?;
        let key = match artifact_path {
            Some(dir) => format!("{dir}/{file_name}"),
            None => file_name.to_string(),
        };
        let bytes = std::fs::read(local_path)?;
        self.artifacts
            .entry(run_id.to_string())
            .or_default()
            .insert(key, bytes);
        Ok(())
    }
}
