//! Import driver - one bundle's rows into a destination experiment

mod decoder;

pub use decoder::{decode_row, DecodedRun, INFERRED_PARAM_MAX_MAGNITUDE};

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::artifacts::ArtifactMirror;
use crate::bundle::{read_table, write_summary, ColumnLedger, FlatRow, ImportSummary, IMPORT_SUMMARY_FILE};
use crate::config::TrackingConfig;
use crate::tracking::{ExperimentRecord, RunStatus, TrackingStore};
use crate::{Error, Result};

/// Knobs for one import invocation.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Path of the column ledger file, if one is available.
    pub ledger_path: Option<PathBuf>,
    /// Directory holding mirrored artifact trees keyed by original run id
    /// (a bundle's `artifacts/` directory).
    pub artifacts_dir: Option<PathBuf>,
    /// Upload mirrored artifacts to the newly created runs.
    pub import_artifacts: bool,
    /// Create the destination experiment if it does not exist.
    pub create_experiment: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            ledger_path: None,
            artifacts_dir: None,
            import_artifacts: true,
            create_experiment: true,
        }
    }
}

/// Reconstructs runs from a bundle's table into a destination experiment.
///
/// Each row moves `pending -> succeeded | failed` independently: a failed
/// row is recorded and never blocks the rows after it.
pub struct ImportDriver<'a> {
    store: &'a dyn TrackingStore,
    config: &'a TrackingConfig,
}

impl<'a> ImportDriver<'a> {
    /// Create an import driver over a store.
    #[must_use]
    pub fn new(store: &'a dyn TrackingStore, config: &'a TrackingConfig) -> Self {
        Self { store, config }
    }

    /// Import every row of the table at `table_path` into
    /// `experiment_name`, writing `import_summary.json` beside the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination experiment cannot be resolved
    /// or created, or the table itself cannot be read. Individual row
    /// failures are recorded in the summary instead.
    pub fn import(
        &self,
        table_path: &Path,
        experiment_name: &str,
        options: &ImportOptions,
    ) -> Result<ImportSummary> {
        let experiment = self.resolve_destination(experiment_name, options)?;
        let rows = read_table(table_path)?;
        info!(
            rows = rows.len(),
            table = %table_path.display(),
            experiment = experiment.name(),
            "importing runs"
        );

        let ledger = match &options.ledger_path {
            Some(path) => ColumnLedger::load(path),
            None => ColumnLedger::default(),
        };
        if ledger.is_empty() {
            debug!("no ledger available, relying on prefixes and inference");
        }

        let mut imported_run_ids = Vec::new();
        let mut failed_row_indices = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            match self.import_row(row, &experiment, &ledger, options) {
                Ok(run_id) => {
                    debug!(row = index, run_id = %run_id, "row imported");
                    imported_run_ids.push(run_id);
                }
                Err(e) => {
                    warn!(row = index, error = %e, "row import failed, continuing");
                    failed_row_indices.push(index);
                }
            }
        }

        let summary = ImportSummary {
            attempted: rows.len(),
            succeeded: imported_run_ids.len(),
            failed: failed_row_indices.len(),
            failed_row_indices,
            imported_run_ids,
            experiment_name: experiment.name().to_string(),
            experiment_id: experiment.experiment_id().to_string(),
            tracking_uri: self.config.uri().to_string(),
        };
        let summary_path = table_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(IMPORT_SUMMARY_FILE);
        write_summary(&summary_path, &summary)?;
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "import complete"
        );
        Ok(summary)
    }

    fn resolve_destination(
        &self,
        experiment_name: &str,
        options: &ImportOptions,
    ) -> Result<ExperimentRecord> {
        if let Some(experiment) = self.store.experiment_by_name(experiment_name)? {
            info!(
                name = experiment.name(),
                id = experiment.experiment_id(),
                "importing into existing experiment"
            );
            return Ok(experiment);
        }
        if options.create_experiment {
            let experiment = self.store.create_experiment(experiment_name)?;
            info!(
                name = experiment.name(),
                id = experiment.experiment_id(),
                "created destination experiment"
            );
            return Ok(experiment);
        }
        let known = self
            .store
            .list_experiments()?
            .into_iter()
            .map(|e| e.name().to_string())
            .collect();
        Err(Error::ExperimentNotFound {
            name: experiment_name.to_string(),
            known,
        })
    }

    fn import_row(
        &self,
        row: &FlatRow,
        experiment: &ExperimentRecord,
        ledger: &ColumnLedger,
        options: &ImportOptions,
    ) -> Result<String> {
        let decoded = decode_row(row, ledger);
        let user_id = row.get("user_id").unwrap_or("");
        let run = self.store.create_run(experiment.experiment_id(), user_id)?;
        self.store.log_batch(
            run.run_id(),
            decoded.params(),
            decoded.metrics(),
            decoded.tags(),
        )?;

        if options.import_artifacts {
            // Keyed by the original run identifier recorded in the row,
            // not the run that was just created.
            match (row.get("run_id"), &options.artifacts_dir) {
                (Some(original_run_id), Some(artifacts_dir)) => {
                    let src = artifacts_dir.join(original_run_id);
                    if src.is_dir() {
                        let uploaded = ArtifactMirror::new(self.store).upload_run(&src, run.run_id());
                        debug!(
                            original = original_run_id,
                            run_id = run.run_id(),
                            files = uploaded,
                            "mirrored artifacts"
                        );
                    } else {
                        debug!(original = original_run_id, "no mirrored artifacts for run");
                    }
                }
                (None, Some(_)) => {
                    warn!("row carries no run_id, cannot locate mirrored artifacts");
                }
                _ => {}
            }
        }

        self.store.terminate_run(run.run_id(), RunStatus::Finished)?;
        Ok(run.run_id().to_string())
    }
}
