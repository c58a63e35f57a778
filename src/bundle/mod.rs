//! Export bundle - the flat-file representation exchanged between stores
//!
//! One bundle holds everything an import needs:
//!
//! ```text
//! <root>/<experiment>_runs.csv       one row per run
//! <root>/<experiment>_metadata.json  column ledger
//! <root>/export_summary.json         counts and source URI
//! <root>/import_summary.json         written by later imports
//! <root>/artifacts/<run-id>/...      mirrored artifact files
//! ```
//!
//! A bundle is created by one export invocation and consumed, never
//! mutated, by any number of later imports.

mod ledger;
mod table;

pub use ledger::{ColumnGroup, ColumnLedger};
pub use table::{
    is_system_column, read_table, table_header, write_table, FlatRow, SYSTEM_COLUMNS,
};

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// File name of the export summary inside a bundle.
pub const EXPORT_SUMMARY_FILE: &str = "export_summary.json";

/// File name of the import summary, written beside the consumed table.
pub const IMPORT_SUMMARY_FILE: &str = "import_summary.json";

/// Resolves the paths of one bundle's files under a root directory.
#[derive(Debug, Clone)]
pub struct BundleLayout {
    root: PathBuf,
    experiment_name: String,
}

impl BundleLayout {
    /// Describe a bundle for `experiment_name` under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, experiment_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            experiment_name: experiment_name.into(),
        }
    }

    /// Get the bundle root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the tabular runs file.
    #[must_use]
    pub fn table_path(&self) -> PathBuf {
        self.root.join(format!("{}_runs.csv", self.experiment_name))
    }

    /// Path of the column ledger file.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.root
            .join(format!("{}_metadata.json", self.experiment_name))
    }

    /// Path of the export summary file.
    #[must_use]
    pub fn export_summary_path(&self) -> PathBuf {
        self.root.join(EXPORT_SUMMARY_FILE)
    }

    /// Root of the mirrored artifact trees.
    #[must_use]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    /// Artifact tree of one run, keyed by its original run id.
    #[must_use]
    pub fn run_artifacts_dir(&self, run_id: &str) -> PathBuf {
        self.artifacts_dir().join(run_id)
    }
}

/// Counts and identifiers recorded at the end of an export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportSummary {
    /// When the export finished.
    pub exported_at: DateTime<Utc>,
    /// Runs written to the table.
    pub total_runs: usize,
    /// Runs whose status was FINISHED at export time.
    pub finished_runs: usize,
    /// Runs whose status was FAILED at export time.
    pub failed_runs: usize,
    /// Source experiment name.
    pub experiment_name: String,
    /// Source experiment id.
    pub experiment_id: String,
    /// Source tracking URI.
    pub tracking_uri: String,
    /// Distinct parameter columns observed.
    pub parameter_columns: usize,
    /// Distinct metric columns observed.
    pub metric_columns: usize,
    /// Distinct tag columns observed.
    pub tag_columns: usize,
}

/// Counts and identifiers recorded at the end of an import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows read from the table.
    pub attempted: usize,
    /// Rows that became runs in the destination experiment.
    pub succeeded: usize,
    /// Rows that failed.
    pub failed: usize,
    /// Zero-based indices of the failed rows.
    pub failed_row_indices: Vec<usize>,
    /// Run ids created in the destination store, in row order.
    pub imported_run_ids: Vec<String>,
    /// Destination experiment name.
    pub experiment_name: String,
    /// Destination experiment id.
    pub experiment_id: String,
    /// Destination tracking URI.
    pub tracking_uri: String,
}

/// Write a summary document as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialized.
pub fn write_summary<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = BundleLayout::new("/tmp/out", "baseline");
        assert_eq!(
            layout.table_path(),
            Path::new("/tmp/out/baseline_runs.csv")
        );
        assert_eq!(
            layout.ledger_path(),
            Path::new("/tmp/out/baseline_metadata.json")
        );
        assert_eq!(
            layout.run_artifacts_dir("r1"),
            Path::new("/tmp/out/artifacts/r1")
        );
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_SUMMARY_FILE);
        let summary = ExportSummary {
            exported_at: Utc::now(),
            total_runs: 2,
            finished_runs: 1,
            failed_runs: 1,
            experiment_name: "baseline".to_string(),
            experiment_id: "1".to_string(),
            tracking_uri: "mem:".to_string(),
            parameter_columns: 3,
            metric_columns: 2,
            tag_columns: 1,
        };
        write_summary(&path, &summary).unwrap();

        let loaded: ExportSummary =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(loaded, summary);
    }
}
