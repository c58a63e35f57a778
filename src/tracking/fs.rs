//! Directory-backed tracking store
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<experiment-id>/meta.json
//! <root>/<experiment-id>/<run-id>/run.json
//! <root>/<experiment-id>/<run-id>/artifacts/<relative-path>
//! ```
//!
//! Experiment ids are small integers assigned in creation order; run ids
//! are random hex. Every document is a pretty-printed JSON file so a store
//! can be inspected and repaired with ordinary tools.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::{ArtifactEntry, ExperimentRecord, LifecycleStage, RunPage, RunRecord, RunStatus};
use super::TrackingStore;
use crate::{Error, Result};

const EXPERIMENT_META_FILE: &str = "meta.json";
const RUN_FILE: &str = "run.json";
const ARTIFACTS_DIR: &str = "artifacts";

/// Tracking store rooted at a local directory.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Get the store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn experiment_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() && path.join(EXPERIMENT_META_FILE).is_file() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn load_experiment(dir: &Path) -> Result<ExperimentRecord> {
        let file = File::open(dir.join(EXPERIMENT_META_FILE))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn save_experiment(dir: &Path, experiment: &ExperimentRecord) -> Result<()> {
        let file = File::create(dir.join(EXPERIMENT_META_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), experiment)?;
        Ok(())
    }

    fn load_run(run_dir: &Path) -> Result<RunRecord> {
        let file = File::open(run_dir.join(RUN_FILE))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn save_run(run_dir: &Path, run: &RunRecord) -> Result<()> {
        let file = File::create(run_dir.join(RUN_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), run)?;
        Ok(())
    }

    fn experiment_dir_checked(&self, experiment_id: &str) -> Result<PathBuf> {
        let dir = self.root.join(experiment_id);
        if dir.join(EXPERIMENT_META_FILE).is_file() {
            Ok(dir)
        } else {
            Err(Error::Store(format!(
                "experiment '{experiment_id}' not found"
            )))
        }
    }

    fn find_run_dir(&self, run_id: &str) -> Result<PathBuf> {
        for experiment_dir in self.experiment_dirs()? {
            let run_dir = experiment_dir.join(run_id);
            if run_dir.join(RUN_FILE).is_file() {
                return Ok(run_dir);
            }
        }
        Err(Error::RunNotFound(run_id.to_string()))
    }

    fn update_run<F>(&self, run_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut RunRecord) -> Result<()>,
    {
        let run_dir = self.find_run_dir(run_id)?;
        let mut run = Self::load_run(&run_dir)?;
        apply(&mut run)?;
        Self::save_run(&run_dir, &run)
    }

    fn next_experiment_id(&self) -> Result<u64> {
        let mut max_id = 0;
        for dir in self.experiment_dirs()? {
            if let Some(id) = dir
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<u64>().ok())
            {
                max_id = max_id.max(id);
            }
        }
        Ok(max_id + 1)
    }

    // Artifact paths come from bundles and store listings; refuse anything
    // that could step outside the run's artifact root.
    fn artifact_fs_path(artifact_root: &Path, artifact_path: &str) -> Result<PathBuf> {
        let mut path = artifact_root.to_path_buf();
        for segment in artifact_path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(Error::Store(format!(
                    "invalid artifact path '{artifact_path}'"
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

impl TrackingStore for FsStore {
    fn experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>> {
        for dir in self.experiment_dirs()? {
            let experiment = Self::load_experiment(&dir)?;
            if experiment.name() == name {
                return Ok(Some(experiment));
            }
        }
        Ok(None)
    }

    fn experiment_by_id(&self, experiment_id: &str) -> Result<Option<ExperimentRecord>> {
        match self.experiment_dir_checked(experiment_id) {
            Ok(dir) => Ok(Some(Self::load_experiment(&dir)?)),
            Err(_) => Ok(None),
        }
    }

    fn list_experiments(&self) -> Result<Vec<ExperimentRecord>> {
        self.experiment_dirs()?
            .iter()
            .map(|dir| Self::load_experiment(dir))
            .collect()
    }

    fn create_experiment(&self, name: &str) -> Result<ExperimentRecord> {
        if self.experiment_by_name(name)?.is_some() {
            return Err(Error::Store(format!("experiment '{name}' already exists")));
        }
        let id = self.next_experiment_id()?.to_string();
        let dir = self.root.join(&id);
        fs::create_dir_all(&dir)?;
        let experiment = ExperimentRecord::new(id, name);
        Self::save_experiment(&dir, &experiment)?;
        Ok(experiment)
    }

    fn delete_experiment(&self, experiment_id: &str) -> Result<()> {
        let dir = self.experiment_dir_checked(experiment_id)?;
        let mut experiment = Self::load_experiment(&dir)?;
        experiment.delete();
        Self::save_experiment(&dir, &experiment)
    }

    fn restore_experiment(&self, experiment_id: &str) -> Result<()> {
        let dir = self.experiment_dir_checked(experiment_id)?;
        let mut experiment = Self::load_experiment(&dir)?;
        experiment.restore();
        Self::save_experiment(&dir, &experiment)
    }

    fn search_runs(
        &self,
        experiment_id: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<RunPage> {
        let dir = self.experiment_dir_checked(experiment_id)?;
        let mut matching = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let run_dir = entry?.path();
            if !run_dir.join(RUN_FILE).is_file() {
                continue;
            }
            let run = Self::load_run(&run_dir)?;
            if run.lifecycle_stage() == LifecycleStage::Active {
                matching.push(run);
            }
        }
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
        let experiment_dir = self.experiment_dir_checked(experiment_id)?;
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let run_dir = experiment_dir.join(&run_id);
        fs::create_dir_all(&run_dir)?;
        let run = RunRecord::new(run_id, experiment_id, user_id);
        Self::save_run(&run_dir, &run)?;
        Ok(run)
    }

    fn delete_run(&self, run_id: &str) -> Result<()> {
        self.update_run(run_id, |run| {
            run.delete();
            Ok(())
        })
    }

    fn log_batch(
        &self,
        run_id: &str,
        params: &BTreeMap<String, String>,
        metrics: &BTreeMap<String, f64>,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.update_run(run_id, |run| {
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
        })
    }

    fn terminate_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.update_run(run_id, |run| {
            run.terminate(status);
            Ok(())
        })
    }

    fn list_artifacts(&self, run_id: &str, path: Option<&str>) -> Result<Vec<ArtifactEntry>> {
        let run_dir = self.find_run_dir(run_id)?;
        let artifact_root = run_dir.join(ARTIFACTS_DIR);
        let base = match path {
            Some(p) => Self::artifact_fs_path(&artifact_root, p)?,
            None => artifact_root,
        };
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&base)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            let relative = match path {
                Some(p) => format!("{p}/{name}"),
                None => name,
            };
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                entries.push(ArtifactEntry::dir(relative));
            } else {
                entries.push(ArtifactEntry::file(relative, metadata.len()));
            }
        }
        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    fn download_artifact(&self, run_id: &str, artifact_path: &str, dest: &Path) -> Result<()> {
        let run_dir = self.find_run_dir(run_id)?;
        let src = Self::artifact_fs_path(&run_dir.join(ARTIFACTS_DIR), artifact_path)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&src, dest)?;
        Ok(())
    }

    fn upload_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        let run_dir = self.find_run_dir(run_id)?;
        let artifact_root = run_dir.join(ARTIFACTS_DIR);
        let dest_dir = match artifact_path {
            Some(dir) => Self::artifact_fs_path(&artifact_root, dir)?,
            None => artifact_root,
        };
        fs::create_dir_all(&dest_dir)?;
        let file_name = local_path.file_name().ok_or_else(|| {
            Error::Store(format!("invalid artifact source path {}", local_path.display()))
        })?;
        fs::copy(local_path, dest_dir.join(file_name))?;
        Ok(())
    }
}
