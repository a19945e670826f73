//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [data]
//! symbol = "TSLA"
//! path = "data/TSLA.csv"
//! time_frame_days = 3
//!
//! [strategy]
//! rsi_period = 30
//! rsi_threshold = 50.0
//!
//! [backtest]
//! initial_capital = 100000.0
//! breakeven_trigger_pct = 0.10
//!
//! [[backtest.partial_exit_rules]]
//! gain_pct = 0.30
//! size_pct = 0.30
//! ```
//!
//! Every section and field is optional; omitted values take the defaults
//! of [`BacktestConfig::default`], except `breakeven_trigger_pct`: leaving it
//! out of a `[backtest]` table disables the breakeven rule.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use exitlab_core::engine::SimulationConfig;
use exitlab_core::position_management::PartialExitRule;
use exitlab_core::signals::RsiCrossover;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid parameters: {0}")]
    Invalid(#[from] exitlab_core::ConfigError),

    #[error("time_frame_days must be at least 1")]
    ZeroTimeFrame,

    #[error("start_date {start} is after end_date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("sweep section is missing or has no parameter values")]
    EmptySweep,

    #[error("sweep breakeven trigger must be a finite number, got {0}")]
    NonFiniteSweepTrigger(f64),
}

/// Where bars come from and how they are bucketed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub symbol: String,
    /// CSV file with daily bars. `None` means synthetic data must be requested.
    pub path: Option<PathBuf>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Calendar days per simulated bar.
    pub time_frame_days: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbol: "TSLA".into(),
            path: None,
            start_date: None,
            end_date: None,
            time_frame_days: 3,
        }
    }
}

/// RSI crossover parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub rsi_period: usize,
    pub rsi_threshold: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            rsi_period: 30,
            rsi_threshold: 50.0,
        }
    }
}

/// Capital and exit rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub initial_capital: f64,
    /// Omitted inside a `[backtest]` table means disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakeven_trigger_pct: Option<f64>,
    pub partial_exit_rules: Vec<PartialExitRule>,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            breakeven_trigger_pct: Some(0.10),
            partial_exit_rules: vec![
                PartialExitRule::new(0.30, 0.30),
                PartialExitRule::new(0.70, 0.30),
                PartialExitRule::new(1.20, 0.30),
            ],
        }
    }
}

/// A named take-profit ladder for sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLadder {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<PartialExitRule>,
}

/// Parameter grid for `exitlab sweep`.
///
/// Empty lists fall back to the base config's value for that axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Breakeven triggers to try; a negative entry means "disabled".
    pub breakeven_trigger_pcts: Vec<f64>,
    pub ladders: Vec<NamedLadder>,
}

impl SweepConfig {
    pub fn is_empty(&self) -> bool {
        self.breakeven_trigger_pcts.is_empty() && self.ladders.is_empty()
    }
}

/// Complete, reproducible description of a backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    pub backtest: ExitConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepConfig>,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigFileError> {
        if self.data.time_frame_days == 0 {
            return Err(ConfigFileError::ZeroTimeFrame);
        }
        if let (Some(start), Some(end)) = (self.data.start_date, self.data.end_date) {
            if start > end {
                return Err(ConfigFileError::InvertedDateRange { start, end });
            }
        }
        self.signal_generator()?;
        self.simulation_config()?;
        Ok(())
    }

    /// Engine parameters, validated.
    pub fn simulation_config(&self) -> Result<SimulationConfig, exitlab_core::ConfigError> {
        SimulationConfig::new(
            self.backtest.initial_capital,
            self.backtest.breakeven_trigger_pct,
            &self.backtest.partial_exit_rules,
        )
    }

    pub fn signal_generator(&self) -> Result<RsiCrossover, exitlab_core::ConfigError> {
        RsiCrossover::new(self.strategy.rsi_period, self.strategy.rsi_threshold)
    }

    /// Deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a RunId. The sweep section does
    /// not take part: it describes how to vary a run, not the run itself.
    pub fn run_id(&self) -> RunId {
        let mut hashed = self.clone();
        hashed.sweep = None;
        let bytes =
            serde_json::to_vec(&hashed).unwrap_or_else(|_| format!("{hashed:?}").into_bytes());
        blake3::hash(&bytes).to_hex().to_string()
    }

    /// Short prefix of [`run_id`](Self::run_id) for directory names.
    pub fn short_id(&self) -> String {
        self.run_id()[..12].to_string()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
