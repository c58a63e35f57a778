//! Encode/decode round-trip benchmarks
//!
//! Tracks the per-row cost of the export encoder and the three decoder
//! tiers (prefix, ledger, inference).

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use runport::bundle::{ColumnGroup, ColumnLedger, FlatRow};
use runport::export::encode_run;
use runport::import::decode_row;
use runport::tracking::RunRecord;

const WIDTH: usize = 32;

fn synthetic_run() -> RunRecord {
    let mut builder = RunRecord::builder("bench-run", "1").user_id("bench");
    for i in 0..WIDTH {
        builder = builder
            .param(format!("param_{i}"), format!("value_{i}"))
            .metric(format!("metric_{i}"), i as f64 * 0.37)
            .tag(format!("tag_{i}"), format!("label_{i}"));
    }
    builder.build()
}

fn bench_encode(c: &mut Criterion) {
    let run = synthetic_run();
    c.bench_function("encode_run_32x3", |b| {
        b.iter(|| encode_run(black_box(&run)));
    });
}

fn bench_decode_prefixed(c: &mut Criterion) {
    let run = synthetic_run();
    let (row, _) = encode_run(&run);
    let ledger = ColumnLedger::new();
    c.bench_function("decode_row_prefixed_32x3", |b| {
        b.iter(|| decode_row(black_box(&row), &ledger));
    });
}

fn bench_decode_via_ledger(c: &mut Criterion) {
    // Prefix-less columns force the ledger tier
    let mut row = FlatRow::new();
    let mut ledger = ColumnLedger::new();
    for i in 0..WIDTH {
        let name = format!("metric_{i}");
        ledger.observe(ColumnGroup::Metric, &name);
        row.insert(name, format!("{}", i as f64 * 0.37));
    }
    c.bench_function("decode_row_ledger_32", |b| {
        b.iter(|| decode_row(black_box(&row), &ledger));
    });
}

fn bench_decode_inferred(c: &mut Criterion) {
    // No prefixes, no ledger: every column goes through shape inference
    let mut row = FlatRow::new();
    for i in 0..WIDTH {
        row.insert(format!("metric_{i}"), format!("{}", i as f64 * 0.37 + 0.01));
    }
    let ledger = ColumnLedger::new();
    c.bench_function("decode_row_inferred_32", |b| {
        b.iter(|| decode_row(black_box(&row), &ledger));
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode_prefixed,
    bench_decode_via_ledger,
    bench_decode_inferred
);
criterion_main!(benches);
