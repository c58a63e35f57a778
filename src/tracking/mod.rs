//! Tracking store contract and backends
//!
//! Everything the migration tool needs from a tracking service is behind
//! the [`TrackingStore`] trait: experiment lookup, paginated run search,
//! run lifecycle operations, and path-addressed artifact transfer. Two
//! backends ship with the crate:
//!
//! - [`MemoryStore`] - in-memory maps, used by tests and demos.
//! - [`FsStore`] - a directory-per-experiment layout on the local
//!   filesystem, reachable from the CLI via `file:` tracking URIs.
//!
//! A remote HTTP transport would be a third implementor of the same trait;
//! the rest of the crate never sees anything but `&dyn TrackingStore`.

mod artifact;
mod experiment;
mod fs;
mod memory;
mod run;

pub use artifact::ArtifactEntry;
pub use experiment::ExperimentRecord;
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use run::{LifecycleStage, RunRecord, RunRecordBuilder, RunStatus};

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::TrackingConfig;
use crate::{Error, Result};

/// One page of a paginated run search.
#[derive(Debug, Clone)]
pub struct RunPage {
    runs: Vec<RunRecord>,
    next_page_token: Option<String>,
}

impl RunPage {
    /// Create a page from its runs and continuation token.
    #[must_use]
    pub fn new(runs: Vec<RunRecord>, next_page_token: Option<String>) -> Self {
        Self {
            runs,
            next_page_token,
        }
    }

    /// Get the runs of this page.
    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Get the opaque continuation token, absent on the last page.
    #[must_use]
    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    /// Consume the page into its runs and continuation token.
    #[must_use]
    pub fn into_parts(self) -> (Vec<RunRecord>, Option<String>) {
        (self.runs, self.next_page_token)
    }
}

/// The tracking service contract consumed by export and import.
///
/// All methods are synchronous and take `&self`; backends provide their
/// own interior mutability. The trait is object-safe so drivers can hold a
/// `&dyn TrackingStore` regardless of backend.
pub trait TrackingStore {
    /// Look up an experiment by name, in any lifecycle stage.
    fn experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>>;

    /// Look up an experiment by id, in any lifecycle stage.
    fn experiment_by_id(&self, experiment_id: &str) -> Result<Option<ExperimentRecord>>;

    /// List all experiments, including soft-deleted ones.
    fn list_experiments(&self) -> Result<Vec<ExperimentRecord>>;

    /// Create a new active experiment with the given name.
    ///
    /// Fails if an experiment with that name already exists.
    fn create_experiment(&self, name: &str) -> Result<ExperimentRecord>;

    /// Soft-delete an experiment.
    fn delete_experiment(&self, experiment_id: &str) -> Result<()>;

    /// Restore a soft-deleted experiment.
    fn restore_experiment(&self, experiment_id: &str) -> Result<()>;

    /// Search active runs of an experiment, bounded to `max_results` per
    /// page. Pass the previous page's continuation token to advance; the
    /// token is opaque to callers.
    fn search_runs(
        &self,
        experiment_id: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<RunPage>;

    /// Open a new run under an experiment, in Running status.
    fn create_run(&self, experiment_id: &str, user_id: &str) -> Result<RunRecord>;

    /// Soft-delete a run.
    fn delete_run(&self, run_id: &str) -> Result<()>;

    /// Apply parameters, metrics, and tags to a run in one call.
    fn log_batch(
        &self,
        run_id: &str,
        params: &BTreeMap<String, String>,
        metrics: &BTreeMap<String, f64>,
        tags: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Complete a run with the given final status.
    fn terminate_run(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// List the immediate children of a run's artifact tree at `path`
    /// (the artifact root when `None`).
    fn list_artifacts(&self, run_id: &str, path: Option<&str>) -> Result<Vec<ArtifactEntry>>;

    /// Download one artifact file to `dest`, creating parent directories.
    fn download_artifact(&self, run_id: &str, artifact_path: &str, dest: &Path) -> Result<()>;

    /// Upload one local file as a run artifact. `artifact_path` is the
    /// destination directory relative to the artifact root; `None` places
    /// the file at the root.
    fn upload_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()>;
}

/// Open the tracking store named by a configuration's URI.
///
/// Recognized forms: `file:<path>`, `mem:`, and a bare directory path
/// (treated as `file:`). Network schemes are rejected.
///
/// # Errors
///
/// Returns [`Error::UnsupportedUri`] for unrecognized schemes and any
/// store error from opening the backend.
pub fn connect(config: &TrackingConfig) -> Result<Box<dyn TrackingStore>> {
    let uri = config.uri();
    if let Some(path) = uri.strip_prefix("file:") {
        return Ok(Box::new(FsStore::open(Path::new(path))?));
    }
    if uri == "mem:" {
        return Ok(Box::new(MemoryStore::new()));
    }
    if uri.contains("://") {
        return Err(Error::UnsupportedUri(uri.to_string()));
    }
    Ok(Box::new(FsStore::open(Path::new(uri))?))
}

/// Resolve an experiment by name first, then by id.
///
/// # Errors
///
/// Returns [`Error::ExperimentNotFound`] carrying the names the store
/// does know about, so the operator can spot a typo or a wrong URI.
pub fn resolve_experiment(
    store: &dyn TrackingStore,
    name_or_id: &str,
) -> Result<ExperimentRecord> {
    if let Some(experiment) = store.experiment_by_name(name_or_id)? {
        return Ok(experiment);
    }
    if let Some(experiment) = store.experiment_by_id(name_or_id)? {
        return Ok(experiment);
    }
    let known = store
        .list_experiments()?
        .into_iter()
        .map(|e| e.name().to_string())
        .collect();
    Err(Error::ExperimentNotFound {
        name: name_or_id.to_string(),
        known,
    })
}
