//! Criterion benchmarks for the optimizer hot path.
//!
//! Run with: `cargo bench -p macross-runner`
//!
//! Measures a single evaluation (signals + simulation + metrics) and a full
//! sweep over a reduced grid, sequential and parallel.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use macross_core::data::SyntheticProvider;
use macross_core::{MovingAverages, PriceBar, Strategy, Windows};
use macross_runner::{
    evaluate_metrics, optimize, DateRange, EvalOptions, ParamGrid, SweepOptions, WindowRange,
};

fn period() -> DateRange {
    DateRange {
        start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
    }
}

/// Ten years of weekday bars.
fn bench_bars() -> Vec<PriceBar> {
    let p = period();
    SyntheticProvider::new().generate("BENCH", p.start, p.end)
}

fn bench_single_evaluation(c: &mut Criterion) {
    let bars = bench_bars();
    let windows = Windows::new(20, 50, 100).unwrap();
    let averages = MovingAverages::for_windows(&bars, windows.as_array());
    let options = EvalOptions::default();

    let mut group = c.benchmark_group("single_evaluation");
    for strategy in Strategy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &strategy, |b, &s| {
            b.iter(|| {
                evaluate_metrics(
                    black_box(&bars),
                    &averages,
                    s,
                    windows,
                    period(),
                    &options,
                )
            });
        });
    }
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let bars = bench_bars();
    let grid = ParamGrid {
        short: WindowRange::new(5, 15),
        medium: WindowRange::new(20, 40),
        long: WindowRange::new(50, 80),
        strategies: Strategy::ALL.to_vec(),
    };

    let mut group = c.benchmark_group("sweep");
    group.sample_size(10);
    for parallel in [false, true] {
        let options = SweepOptions {
            parallel,
            ..Default::default()
        };
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| optimize("BENCH", black_box(&bars), period(), &grid, &options));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_evaluation, bench_sweep);
criterion_main!(benches);
