//! ExitLab Runner: backtest orchestration, metrics, sweeps, artifacts.
//!
//! This crate builds on `exitlab-core` to provide:
//! - TOML configuration with run fingerprinting
//! - Bar loading from CSV or a seeded synthetic walk
//! - Performance metrics over the simulated portfolio
//! - Single-run orchestration (load → resample → signals → simulate → metrics)
//! - Parallel parameter sweeps over exit rules
//! - JSON/CSV artifacts and Markdown reports

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigFileError, RunId};
pub use data_loader::{load_bars, DataSource, LoadError, LoadOptions, LoadedData};
pub use export::{import_json, load_artifacts, save_artifacts};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use report::{generate_report, generate_sweep_report, TradeStats};
pub use runner::{
    run_backtest_from_data, run_single_backtest, BacktestResult, RunError, SCHEMA_VERSION,
};
pub use sweep::{ParamSweep, SweepGrid, SweepOutcome, SweepPoint, SweepResults};
