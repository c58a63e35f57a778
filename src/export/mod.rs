//! Export driver - one experiment's run set to one bundle

mod encoder;
mod pager;

pub use encoder::encode_run;
pub use pager::RunPager;

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::artifacts::ArtifactMirror;
use crate::bundle::{
    table_header, write_summary, write_table, BundleLayout, ColumnGroup, ColumnLedger,
    ExportSummary, FlatRow,
};
use crate::config::TrackingConfig;
use crate::tracking::{resolve_experiment, RunRecord, RunStatus, TrackingStore};
use crate::Result;

/// Knobs for one export invocation.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Mirror each run's artifact tree into the bundle.
    pub include_artifacts: bool,
    /// Upper bound on runs fetched per store request.
    pub page_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_artifacts: true,
            page_size: 1000,
        }
    }
}

/// Serializes one experiment's runs into an export bundle.
pub struct Exporter<'a> {
    store: &'a dyn TrackingStore,
    config: &'a TrackingConfig,
}

impl<'a> Exporter<'a> {
    /// Create an exporter over a store.
    ///
    /// The configuration is only consulted for the URI recorded in the
    /// export summary; the store connection already happened.
    #[must_use]
    pub fn new(store: &'a dyn TrackingStore, config: &'a TrackingConfig) -> Self {
        Self { store, config }
    }

    /// Export `experiment` (by name or id) into a bundle under
    /// `output_dir`.
    ///
    /// The whole current run set is paged in, encoded into flat rows, and
    /// written as one table plus the column ledger; artifact trees are
    /// mirrored per run when requested. Store retrieval errors are fatal;
    /// per-artifact failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the experiment cannot be resolved, a run page
    /// cannot be retrieved, or a bundle file cannot be written.
    pub fn export(
        &self,
        experiment: &str,
        output_dir: &Path,
        options: &ExportOptions,
    ) -> Result<ExportSummary> {
        let experiment = resolve_experiment(self.store, experiment)?;
        info!(
            name = experiment.name(),
            id = experiment.experiment_id(),
            uri = self.config.uri(),
            "exporting experiment"
        );

        let layout = BundleLayout::new(output_dir, experiment.name());
        fs::create_dir_all(layout.root())?;

        let mut ledger = ColumnLedger::new();
        let mut rows: Vec<FlatRow> = Vec::new();
        let mut runs: Vec<RunRecord> = Vec::new();
        for run in RunPager::new(self.store, experiment.experiment_id(), options.page_size) {
            let run = run?;
            let (row, introduced) = encode_run(&run);
            for (group, column) in &introduced {
                ledger.observe(*group, column);
            }
            rows.push(row);
            runs.push(run);
        }
        info!(runs = rows.len(), "retrieved all runs from experiment");

        write_table(&layout.table_path(), &table_header(&ledger), &rows)?;
        ledger.save(&layout.ledger_path())?;
        info!(
            table = %layout.table_path().display(),
            ledger = %layout.ledger_path().display(),
            "bundle files written"
        );

        if options.include_artifacts {
            let mirror = ArtifactMirror::new(self.store);
            for run in &runs {
                let copied = mirror.download_run(run.run_id(), &layout.run_artifacts_dir(run.run_id()));
                if copied > 0 {
                    info!(run_id = run.run_id(), files = copied, "mirrored artifacts");
                }
            }
        } else {
            warn!("artifact mirroring disabled, bundle will carry no artifacts");
        }

        let summary = ExportSummary {
            exported_at: chrono::Utc::now(),
            total_runs: runs.len(),
            finished_runs: runs
                .iter()
                .filter(|r| r.status() == RunStatus::Finished)
                .count(),
            failed_runs: runs
                .iter()
                .filter(|r| r.status() == RunStatus::Failed)
                .count(),
            experiment_name: experiment.name().to_string(),
            experiment_id: experiment.experiment_id().to_string(),
            tracking_uri: self.config.uri().to_string(),
            parameter_columns: ledger.columns(ColumnGroup::Parameter).len(),
            metric_columns: ledger.columns(ColumnGroup::Metric).len(),
            tag_columns: ledger.columns(ColumnGroup::Tag).len(),
        };
        write_summary(&layout.export_summary_path(), &summary)?;
        info!(
            total = summary.total_runs,
            parameters = summary.parameter_columns,
            metrics = summary.metric_columns,
            tags = summary.tag_columns,
            dir = %layout.root().display(),
            "export complete"
        );
        Ok(summary)
    }
}
