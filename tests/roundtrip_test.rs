//! Round-trip tests for the encoder/decoder pair
//!
//! The core guarantee: a run's parameters, metrics, and tags survive the
//! trip through the untyped flat row, with or without the ledger.

use runport::bundle::{read_table, table_header, write_table, ColumnGroup, ColumnLedger, FlatRow};
use runport::export::encode_run;
use runport::import::decode_row;
use runport::tracking::{RunRecord, RunStatus};

fn sample_run() -> RunRecord {
    RunRecord::builder("r1", "1")
        .user_id("alice")
        .status(RunStatus::Finished)
        .param("lr", "0.01")
        .param("optimizer", "adam")
        .metric("loss", 0.53)
        .metric("auc", 0.91)
        .tag("owner", "alice")
        .build()
}

fn ledger_for(run: &RunRecord) -> ColumnLedger {
    let (_, introduced) = encode_run(run);
    let mut ledger = ColumnLedger::new();
    for (group, column) in introduced {
        ledger.observe(group, &column);
    }
    ledger
}

// =============================================================================
// Encode/decode round trips
// =============================================================================

#[test]
fn test_round_trip_with_ledger() {
    let run = sample_run();
    let (row, _) = encode_run(&run);
    let decoded = decode_row(&row, &ledger_for(&run));

    assert_eq!(decoded.params(), run.params());
    assert_eq!(decoded.metrics(), run.metrics());
    assert_eq!(decoded.tags(), run.tags());
}

#[test]
fn test_round_trip_without_ledger() {
    // Prefix routing is ledger-independent
    let run = sample_run();
    let (row, _) = encode_run(&run);
    let decoded = decode_row(&row, &ColumnLedger::new());

    assert_eq!(decoded.params(), run.params());
    assert_eq!(decoded.metrics(), run.metrics());
    assert_eq!(decoded.tags(), run.tags());
}

#[test]
fn test_round_trip_shared_names_across_groups() {
    let run = RunRecord::builder("r1", "1")
        .param("quality", "high")
        .metric("quality", 0.93)
        .tag("quality", "audited")
        .build();
    let (row, _) = encode_run(&run);
    let decoded = decode_row(&row, &ColumnLedger::new());

    assert_eq!(decoded.params().get("quality").map(String::as_str), Some("high"));
    assert!((decoded.metrics()["quality"] - 0.93).abs() < f64::EPSILON);
    assert_eq!(decoded.tags().get("quality").map(String::as_str), Some("audited"));
}

#[test]
fn test_round_trip_through_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs.csv");

    let run = sample_run();
    let (row, _) = encode_run(&run);
    let ledger = ledger_for(&run);
    write_table(&path, &table_header(&ledger), &[row]).unwrap();

    let rows = read_table(&path).unwrap();
    assert_eq!(rows.len(), 1);
    let decoded = decode_row(&rows[0], &ledger);

    assert_eq!(decoded.params(), run.params());
    assert_eq!(decoded.metrics(), run.metrics());
    assert_eq!(decoded.tags(), run.tags());
}

// =============================================================================
// Documented example behavior
// =============================================================================

#[test]
fn test_example_run_encodes_to_documented_columns() {
    let run = RunRecord::builder("r1", "1")
        .param("lr", "0.01")
        .metric("loss", 0.53)
        .tag("owner", "alice")
        .build();
    let (row, _) = encode_run(&run);

    assert_eq!(row.get("param:lr"), Some("0.01"));
    assert_eq!(row.get("metric:loss"), Some("0.53"));
    assert_eq!(row.get("tag:owner"), Some("alice"));
}

#[test]
fn test_bare_integer_column_inferred_as_parameter() {
    let mut row = FlatRow::new();
    row.insert("epochs", "10");
    let decoded = decode_row(&row, &ColumnLedger::new());
    assert_eq!(decoded.params().get("epochs").map(String::as_str), Some("10"));
    assert!(decoded.metrics().is_empty());
}

#[test]
fn test_bare_fractional_column_inferred_as_metric() {
    let mut row = FlatRow::new();
    row.insert("auc", "0.91");
    let decoded = decode_row(&row, &ColumnLedger::new());
    assert!((decoded.metrics()["auc"] - 0.91).abs() < f64::EPSILON);
    assert!(decoded.params().is_empty());
}

// =============================================================================
// Ledger as decoding aid for prefix-less tables
// =============================================================================

#[test]
fn test_hand_edited_table_decodes_via_ledger() {
    // A table whose columns lost their prefixes, with a ledger listing the
    // bare names, still routes correctly.
    let mut ledger = ColumnLedger::new();
    ledger.observe(ColumnGroup::Parameter, "lr");
    ledger.observe(ColumnGroup::Metric, "loss");
    ledger.observe(ColumnGroup::Tag, "owner");

    let mut row = FlatRow::new();
    row.insert("lr", "0.01");
    row.insert("loss", "0.53");
    row.insert("owner", "alice");
    let decoded = decode_row(&row, &ledger);

    assert_eq!(decoded.params().get("lr").map(String::as_str), Some("0.01"));
    assert!((decoded.metrics()["loss"] - 0.53).abs() < f64::EPSILON);
    assert_eq!(decoded.tags().get("owner").map(String::as_str), Some("alice"));
}

#[test]
fn test_stale_ledger_never_breaks_prefixed_decoding() {
    // Ledger from some other export; prefixed columns ignore it.
    let mut ledger = ColumnLedger::new();
    ledger.observe(ColumnGroup::Metric, "param:lr");

    let run = sample_run();
    let (row, _) = encode_run(&run);
    let decoded = decode_row(&row, &ledger);
    assert_eq!(decoded.params(), run.params());
    assert_eq!(decoded.metrics(), run.metrics());
}
