//! Backtest runner: wires together loading, resampling, signals, engine and metrics.
//!
//! Entry points:
//! - `run_single_backtest()`: loads bars per the config, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded daily bars.
//! - `prepare_series()` + `run_prepared()`: split form used by sweeps, which
//!   resample and generate signals once and vary only the exit parameters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use exitlab_core::data::resample;
use exitlab_core::domain::{Bar, Fill, PortfolioState, RoundTrip};
use exitlab_core::engine::{extract_round_trips, run_simulation};
use exitlab_core::signals::SignalGenerator;
use exitlab_core::{ConfigError, ResampleError, SimulationError};

use crate::config::{BacktestConfig, ConfigFileError, RunId};
use crate::data_loader::{load_bars, DataSource, LoadError, LoadOptions, LoadedData};
use crate::metrics::{
    buy_and_hold_equity, drawdown_series, MetricsCalculator, PerformanceMetrics,
};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigFileError),
    #[error("invalid parameters: {0}")]
    Params(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("resample error: {0}")]
    Resample(#[from] ResampleError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub symbol: String,
    pub source: DataSource,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Daily bars before resampling.
    pub daily_bar_count: usize,
    /// Resampled bars dropped while the indicator warmed up.
    pub warmup_bars: usize,
    /// Simulated bars, signals attached.
    pub bars: Vec<Bar>,
    /// Indicator value per simulated bar.
    pub indicator: Vec<f64>,
    pub states: Vec<PortfolioState>,
    pub fills: Vec<Fill>,
    pub trades: Vec<RoundTrip>,
    pub metrics: PerformanceMetrics,
    pub drawdown: Vec<f64>,
    pub buy_and_hold_equity: Vec<f64>,
}

impl BacktestResult {
    pub fn final_value(&self) -> f64 {
        self.states
            .last()
            .map_or(self.config.backtest.initial_capital, |s| s.total_value)
    }

    /// Short prefix of the run id for directory names and tables.
    pub fn short_id(&self) -> &str {
        &self.run_id[..self.run_id.len().min(12)]
    }
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Resampled, signal-annotated bars ready for simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSeries {
    pub bars: Vec<Bar>,
    pub indicator: Vec<f64>,
    pub warmup_bars: usize,
    pub daily_bar_count: usize,
}

/// Run a single backtest from a BacktestConfig (loads data per `config.data`).
pub fn run_single_backtest(
    config: &BacktestConfig,
    opts: &LoadOptions,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.data, opts)?;
    run_backtest_from_data(config, &loaded)
}

/// Run a backtest with pre-loaded daily bars. No I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    let series = prepare_series(config, &loaded.bars)?;
    run_prepared(config, loaded, &series)
}

/// Resample daily bars and attach signals.
pub fn prepare_series(
    config: &BacktestConfig,
    daily: &[Bar],
) -> Result<PreparedSeries, RunError> {
    let span = config.data.time_frame_days;
    let resampled = resample(daily, span)?;
    info!(
        daily = daily.len(),
        resampled = resampled.len(),
        span_days = span,
        "resampled bars"
    );

    let generator = config.signal_generator()?;
    let series = generator.generate(&resampled);
    if series.warmup_dropped > 0 {
        warn!(
            dropped = series.warmup_dropped,
            signal = generator.name(),
            "dropped warmup bars with undefined indicator"
        );
    }

    Ok(PreparedSeries {
        bars: series.bars,
        indicator: series.indicator,
        warmup_bars: series.warmup_dropped,
        daily_bar_count: daily.len(),
    })
}

/// Simulate prepared bars under `config`'s exit rules and compute metrics.
pub fn run_prepared(
    config: &BacktestConfig,
    loaded: &LoadedData,
    series: &PreparedSeries,
) -> Result<BacktestResult, RunError> {
    let sim_config = config.simulation_config()?;
    let result = run_simulation(&series.bars, &sim_config)?;
    let trades = extract_round_trips(&result.fills, &series.bars);

    let calculator =
        MetricsCalculator::for_bar_span(sim_config.initial_capital, config.data.time_frame_days);
    let metrics = calculator.compute(&result.states, &series.bars);

    let equity: Vec<f64> = result.states.iter().map(|s| s.total_value).collect();
    let drawdown = drawdown_series(&equity);
    let buy_and_hold = buy_and_hold_equity(&series.bars, sim_config.initial_capital);

    info!(
        bars = series.bars.len(),
        fills = result.fills.len(),
        trades = trades.len(),
        total_return = metrics.total_return,
        "simulation complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config: config.clone(),
        symbol: loaded.symbol.clone(),
        source: loaded.source.clone(),
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        start_date: series.bars.first().map(|b| b.date),
        end_date: series.bars.last().map(|b| b.date),
        daily_bar_count: series.daily_bar_count,
        warmup_bars: series.warmup_bars,
        bars: series.bars.clone(),
        indicator: series.indicator.clone(),
        states: result.states,
        fills: result.fills,
        trades,
        metrics,
        drawdown,
        buy_and_hold_equity: buy_and_hold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{compute_dataset_hash, generate_synthetic_bars};

    fn synthetic(seed: u64) -> LoadedData {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
        let bars = generate_synthetic_bars(start, end, seed);
        LoadedData {
            symbol: "SYN".into(),
            dataset_hash: compute_dataset_hash("SYN", &bars),
            bars,
            source: DataSource::Synthetic { seed },
            has_synthetic: true,
        }
    }

    #[test]
    fn run_from_data_produces_aligned_series() {
        let mut config = BacktestConfig::default();
        config.strategy.rsi_period = 14;
        let loaded = synthetic(7);
        let result = run_backtest_from_data(&config, &loaded).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.run_id, config.run_id());
        assert_eq!(result.states.len(), result.bars.len());
        assert_eq!(result.indicator.len(), result.bars.len());
        assert_eq!(result.drawdown.len(), result.bars.len());
        assert_eq!(result.buy_and_hold_equity.len(), result.bars.len());
        assert_eq!(result.daily_bar_count, loaded.bars.len());
        assert!(result.warmup_bars > 0);
        assert_eq!(result.start_date, result.bars.first().map(|b| b.date));
        assert!(result.has_synthetic);
    }

    #[test]
    fn prepared_series_is_reusable_across_exit_configs() {
        let loaded = synthetic(11);
        let base = BacktestConfig::default();
        let series = prepare_series(&base, &loaded.bars).unwrap();

        let mut no_exits = base.clone();
        no_exits.backtest.breakeven_trigger_pct = None;
        no_exits.backtest.partial_exit_rules.clear();

        let a = run_prepared(&base, &loaded, &series).unwrap();
        let b = run_prepared(&no_exits, &loaded, &series).unwrap();
        assert_eq!(a.bars, b.bars);
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.metrics.buy_and_hold_return, b.metrics.buy_and_hold_return);
    }

    #[test]
    fn too_few_bars_after_warmup_is_a_simulation_error() {
        let mut config = BacktestConfig::default();
        config.strategy.rsi_period = 30;
        let mut loaded = synthetic(3);
        loaded.bars.truncate(40);
        assert!(matches!(
            run_backtest_from_data(&config, &loaded),
            Err(RunError::Simulation(_))
        ));
    }

    #[test]
    fn missing_source_is_a_data_error() {
        let config = BacktestConfig::default();
        assert!(matches!(
            run_single_backtest(&config, &LoadOptions::default()),
            Err(RunError::Data(LoadError::NoSource { .. }))
        ));
    }
}
