//! Criterion benchmarks for ExitLab hot paths.
//!
//! Benchmarks:
//! 1. Simulation fold (full run with ladder and breakeven)
//! 2. RSI crossover signal generation
//! 3. Daily → 3-day resampling

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use exitlab_core::data::resample;
use exitlab_core::domain::Bar;
use exitlab_core::engine::{run_simulation, SimulationConfig};
use exitlab_core::position_management::PartialExitRule;
use exitlab_core::signals::{RsiCrossover, SignalGenerator};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.02;
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                close - 0.3,
                close + 1.5,
                close - 1.5,
                close,
                1_000_000.0,
            )
        })
        .collect()
}

fn ladder_config() -> SimulationConfig {
    let rules = [
        PartialExitRule::new(0.30, 0.30),
        PartialExitRule::new(0.70, 0.30),
        PartialExitRule::new(1.20, 0.30),
    ];
    SimulationConfig::new(100_000.0, Some(0.10), &rules).unwrap()
}

// ── 1. Simulation fold ───────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    let config = ladder_config();
    let generator = RsiCrossover::new(14, 50.0).unwrap();

    for &bar_count in &[252, 1260, 2520] {
        let series = generator.generate(&make_bars(bar_count));
        group.bench_with_input(
            BenchmarkId::new("rsi_ladder", bar_count),
            &series.bars,
            |b, bars| {
                b.iter(|| run_simulation(black_box(bars), black_box(&config)));
            },
        );
    }

    group.finish();
}

// ── 2. Signals ───────────────────────────────────────────────────────

fn bench_signals(c: &mut Criterion) {
    let bars = make_bars(2520);
    let generator = RsiCrossover::new(30, 50.0).unwrap();
    c.bench_function("rsi_crossover_2520", |b| {
        b.iter(|| generator.generate(black_box(&bars)));
    });
}

// ── 3. Resampling ────────────────────────────────────────────────────

fn bench_resample(c: &mut Criterion) {
    let bars = make_bars(2520);
    c.bench_function("resample_3d_2520", |b| {
        b.iter(|| resample(black_box(&bars), 3));
    });
}

criterion_group!(benches, bench_simulation, bench_signals, bench_resample);
criterion_main!(benches);
