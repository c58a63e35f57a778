//! Property-based tests for the migration core
//!
//! - Round trip: typed run data survives the flat row exactly
//! - Inference: classification is a pure function of the cell text
//! - Pagination: every run is yielded once, however the page size divides

use std::collections::BTreeMap;
use std::collections::HashSet;

use proptest::prelude::*;

use runport::bundle::{ColumnLedger, FlatRow};
use runport::export::{encode_run, RunPager};
use runport::import::decode_row;
use runport::tracking::{MemoryStore, RunRecord, TrackingStore};

// ============================================================================
// Strategies
// ============================================================================

fn arb_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_./-]{0,11}"
}

fn arb_text_value() -> impl Strategy<Value = String> {
    // Printable ASCII, including CSV-hostile characters
    "[ -~]{1,12}"
}

fn arb_metric_value() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("NaN has no equality", |v| !v.is_nan())
}

fn arb_params() -> impl Strategy<Value = BTreeMap<String, String>> {
    proptest::collection::btree_map(arb_key(), arb_text_value(), 0..8)
}

fn arb_metrics() -> impl Strategy<Value = BTreeMap<String, f64>> {
    proptest::collection::btree_map(arb_key(), arb_metric_value(), 0..8)
}

fn build_run(
    params: &BTreeMap<String, String>,
    metrics: &BTreeMap<String, f64>,
    tags: &BTreeMap<String, String>,
) -> RunRecord {
    let mut builder = RunRecord::builder("r1", "1");
    for (name, value) in params {
        builder = builder.param(name.clone(), value.clone());
    }
    for (name, value) in metrics {
        builder = builder.metric(name.clone(), *value);
    }
    for (name, value) in tags {
        builder = builder.tag(name.clone(), value.clone());
    }
    builder.build()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_round_trip_without_ledger(
        params in arb_params(),
        metrics in arb_metrics(),
        tags in arb_params(),
    ) {
        let run = build_run(&params, &metrics, &tags);
        let (row, _) = encode_run(&run);
        let decoded = decode_row(&row, &ColumnLedger::new());

        prop_assert_eq!(decoded.params(), &params);
        prop_assert_eq!(decoded.metrics(), &metrics);
        prop_assert_eq!(decoded.tags(), &tags);
    }

    #[test]
    fn prop_round_trip_with_ledger(
        params in arb_params(),
        metrics in arb_metrics(),
        tags in arb_params(),
    ) {
        let run = build_run(&params, &metrics, &tags);
        let (row, introduced) = encode_run(&run);
        let mut ledger = ColumnLedger::new();
        for (group, column) in introduced {
            ledger.observe(group, &column);
        }
        let decoded = decode_row(&row, &ledger);

        prop_assert_eq!(decoded.params(), &params);
        prop_assert_eq!(decoded.metrics(), &metrics);
        prop_assert_eq!(decoded.tags(), &tags);
    }

    #[test]
    fn prop_inference_is_deterministic(column in arb_key(), value in arb_text_value()) {
        prop_assume!(!runport::bundle::is_system_column(&column));
        let mut row = FlatRow::new();
        row.insert(column.clone(), value);
        let ledger = ColumnLedger::new();

        let first = decode_row(&row, &ledger);
        let second = decode_row(&row, &ledger);
        prop_assert_eq!(&first, &second);

        // Inference always files the column into exactly one group
        let placements = usize::from(first.params().contains_key(&column))
            + usize::from(first.metrics().contains_key(&column))
            + usize::from(first.tags().contains_key(&column));
        prop_assert_eq!(placements, 1);
    }

    #[test]
    fn prop_pagination_yields_each_run_once(run_count in 0usize..30, page_size in 1usize..7) {
        let store = MemoryStore::new();
        let exp = store.create_experiment("baseline").unwrap();
        for _ in 0..run_count {
            store.create_run(exp.experiment_id(), "alice").unwrap();
        }

        let runs: Vec<RunRecord> = RunPager::new(&store, exp.experiment_id(), page_size)
            .collect::<runport::Result<_>>()
            .unwrap();
        prop_assert_eq!(runs.len(), run_count);

        let ids: HashSet<&str> = runs.iter().map(RunRecord::run_id).collect();
        prop_assert_eq!(ids.len(), run_count);
    }
}
