//! Tabular bundle file - flat rows over a CSV file
//!
//! The table is deliberately untyped text: one header row, one record per
//! run, every cell a string. Group identity of the dynamic columns is
//! carried by their `<prefix>:<name>` form and by the side ledger, and is
//! recovered on import by the decoder.

use std::collections::BTreeMap;
use std::path::Path;

use super::ledger::{ColumnGroup, ColumnLedger};
use crate::Result;

/// Fixed system columns, in header order. Never treated as run data.
pub const SYSTEM_COLUMNS: [&str; 7] = [
    "run_id",
    "experiment_id",
    "user_id",
    "start_time",
    "end_time",
    "status",
    "lifecycle_stage",
];

/// Whether a column name is one of the fixed system columns.
#[must_use]
pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMNS.contains(&name)
}

/// One run's projection into a single tabular record.
///
/// Sparse: only cells with a value are present. A cell absent here becomes
/// an empty CSV field on write and is skipped again on read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRow {
    cells: BTreeMap<String, String>,
}

impl FlatRow {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Get a cell's value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Iterate over present cells as (column, value).
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of present cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Build the table header for an export: system columns first, then the
/// ledger's parameter, metric, and tag columns in observation order.
#[must_use]
pub fn table_header(ledger: &ColumnLedger) -> Vec<String> {
    let mut header: Vec<String> = SYSTEM_COLUMNS.iter().map(ToString::to_string).collect();
    for group in [ColumnGroup::Parameter, ColumnGroup::Metric, ColumnGroup::Tag] {
        header.extend(ledger.columns(group).iter().cloned());
    }
    header
}

/// Write rows under the given header to a CSV file at `path`.
///
/// Cells a row does not carry are written as empty fields.
///
/// # Errors
///
/// Returns an error if the file cannot be created or a record fails to
/// serialize.
pub fn write_table(path: &Path, header: &[String], rows: &[FlatRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(header.iter().map(|column| row.get(column).unwrap_or("")))?;
    }
    writer.flush().map_err(crate::Error::from)?;
    Ok(())
}

/// Read a CSV file back into sparse flat rows.
///
/// Empty fields are dropped, so an absent value never reaches the decoder
/// as an empty string.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a record is malformed.
pub fn read_table(path: &Path) -> Result<Vec<FlatRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let header = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = FlatRow::new();
        for (column, value) in header.iter().zip(record.iter()) {
            if !value.is_empty() {
                row.insert(column, value);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Vec<String> {
        let mut ledger = ColumnLedger::new();
        ledger.observe(ColumnGroup::Parameter, "param:lr");
        ledger.observe(ColumnGroup::Metric, "metric:loss");
        ledger.observe(ColumnGroup::Tag, "tag:owner");
        table_header(&ledger)
    }

    #[test]
    fn test_header_order() {
        let header = sample_header();
        assert_eq!(header[..7], SYSTEM_COLUMNS.map(String::from));
        assert_eq!(header[7..], ["param:lr", "metric:loss", "tag:owner"]);
    }

    #[test]
    fn test_is_system_column() {
        assert!(is_system_column("run_id"));
        assert!(is_system_column("lifecycle_stage"));
        assert!(!is_system_column("param:lr"));
        assert!(!is_system_column("loss"));
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");
        let header = sample_header();

        let mut row = FlatRow::new();
        row.insert("run_id", "r1");
        row.insert("status", "FINISHED");
        row.insert("param:lr", "0.01");
        row.insert("metric:loss", "0.53");
        row.insert("tag:owner", "alice");
        write_table(&path, &header, &[row.clone()]).unwrap();

        let rows = read_table(&path).unwrap();
        assert_eq!(rows, vec![row]);
    }

    #[test]
    fn test_absent_cells_stay_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");
        let header = sample_header();

        // Second run never logged the metric
        let mut first = FlatRow::new();
        first.insert("run_id", "r1");
        first.insert("metric:loss", "0.5");
        let mut second = FlatRow::new();
        second.insert("run_id", "r2");
        write_table(&path, &header, &[first, second]).unwrap();

        let rows = read_table(&path).unwrap();
        assert_eq!(rows[0].get("metric:loss"), Some("0.5"));
        assert_eq!(rows[1].get("metric:loss"), None);
        assert!(!rows[1].cells().any(|(_, v)| v.is_empty()));
    }

    #[test]
    fn test_values_with_commas_and_quotes_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");
        let header = vec!["run_id".to_string(), "tag:note".to_string()];

        let mut row = FlatRow::new();
        row.insert("run_id", "r1");
        row.insert("tag:note", "said \"hello, world\"\nand left");
        write_table(&path, &header, &[row.clone()]).unwrap();

        let rows = read_table(&path).unwrap();
        assert_eq!(rows, vec![row]);
    }
}
