//! Benchmarks for the fraud-ring detectors.
//!
//! Uses a synthetic, deterministic ledger (no I/O) for reproducible numbers.
//! Run with: `cargo bench --package mule-analysis`

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mule_analysis::cycle_detector::CycleDetector;
use mule_analysis::detector::{DetectionInput, Detector};
use mule_analysis::graph::AccountGraph;
use mule_analysis::pipeline::run_detection;
use mule_analysis::shell_detector::ShellDetector;
use mule_analysis::smurfing_detector::SmurfingDetector;
use mule_analysis::DetectionConfig;
use mule_data::types::TransactionRecord;

/// Generates `n` transactions over 500 accounts with a mix of short loops,
/// relay chains and hub traffic.
fn synthetic_ledger(n: usize) -> Vec<TransactionRecord> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let sender = (i * 37 + 11) % 500;
            let receiver = match i % 4 {
                0 => (sender + 1) % 500,
                1 => (sender * 7 + 3) % 500,
                2 => 0,
                _ => (i * 13) % 500,
            };
            TransactionRecord::new(
                format!("T{i}"),
                format!("ACC{sender:04}"),
                format!("ACC{receiver:04}"),
                (i % 1000) as f64 + 0.5,
                start + Duration::minutes(i as i64 * 7),
            )
        })
        .collect()
}

/// Benchmark: build the account graph from 10k transactions.
fn bench_graph_build(c: &mut Criterion) {
    let ledger = synthetic_ledger(10_000);
    c.bench_function("graph_build_10k_txs", |b| {
        b.iter(|| AccountGraph::from_transactions(black_box(&ledger)))
    });
}

/// Benchmark: each detector on its own over the same 2k-transaction graph.
fn bench_detectors(c: &mut Criterion) {
    let ledger = synthetic_ledger(2_000);
    let graph = AccountGraph::from_transactions(&ledger);
    let input = DetectionInput {
        graph: &graph,
        transactions: &ledger,
    };

    let cycle = CycleDetector::default();
    c.bench_function("cycle_detector_2k_txs", |b| {
        b.iter(|| cycle.detect(black_box(&input)))
    });

    let shell = ShellDetector::default();
    c.bench_function("shell_detector_2k_txs", |b| {
        b.iter(|| shell.detect(black_box(&input)))
    });

    let smurf = SmurfingDetector::default();
    c.bench_function("smurfing_detector_2k_txs", |b| {
        b.iter(|| smurf.detect(black_box(&input)))
    });
}

/// Benchmark: full pipeline, sequential vs rayon.
fn bench_pipeline(c: &mut Criterion) {
    let ledger = synthetic_ledger(2_000);
    let sequential = DetectionConfig::default();
    let parallel = DetectionConfig {
        parallel: true,
        ..DetectionConfig::default()
    };

    c.bench_function("pipeline_sequential_2k_txs", |b| {
        b.iter(|| run_detection(black_box(&ledger), &sequential))
    });
    c.bench_function("pipeline_parallel_2k_txs", |b| {
        b.iter(|| run_detection(black_box(&ledger), &parallel))
    });
}

criterion_group!(benches, bench_graph_build, bench_detectors, bench_pipeline);
criterion_main!(benches);
