//! Record encoder - one run entity to one flat row

use crate::bundle::{ColumnGroup, FlatRow};
use crate::tracking::RunRecord;

/// Encode one run into a flat row plus the prefixed dynamic columns it
/// introduced (for the ledger to observe).
///
/// System columns are emitted verbatim: timestamps as epoch milliseconds,
/// absent timestamps as absent cells. Each entry of the three key/value
/// groups becomes a `<prefix>:<name>` column with the value in its group's
/// native text form. Nothing is lost within a single row; group identity
/// only becomes ambiguous downstream if the prefix is stripped and the
/// ledger is unavailable, which the decoder's fallback handles.
#[must_use]
pub fn encode_run(run: &RunRecord) -> (FlatRow, Vec<(ColumnGroup, String)>) {
    let mut row = FlatRow::new();
    row.insert("run_id", run.run_id());
    row.insert("experiment_id", run.experiment_id());
    if !run.user_id().is_empty() {
        row.insert("user_id", run.user_id());
    }
    if let Some(start) = run.start_time() {
        row.insert("start_time", start.timestamp_millis().to_string());
    }
    if let Some(end) = run.end_time() {
        row.insert("end_time", end.timestamp_millis().to_string());
    }
    row.insert("status", run.status().as_str());
    row.insert("lifecycle_stage", run.lifecycle_stage().as_str());

    let mut introduced = Vec::new();
    for (name, value) in run.params() {
        let column = ColumnGroup::Parameter.column_name(name);
        row.insert(column.clone(), value.clone());
        introduced.push((ColumnGroup::Parameter, column));
    }
    for (name, value) in run.metrics() {
        let column = ColumnGroup::Metric.column_name(name);
        row.insert(column.clone(), value.to_string());
        introduced.push((ColumnGroup::Metric, column));
    }
    for (name, value) in run.tags() {
        let column = ColumnGroup::Tag.column_name(name);
        row.insert(column.clone(), value.clone());
        introduced.push((ColumnGroup::Tag, column));
    }
    (row, introduced)
}
