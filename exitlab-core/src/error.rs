//! Error taxonomy for the simulation core.
//!
//! Configuration and data errors are fatal and surface before any bar is
//! simulated. Degenerate numeric cases (zero variance, zero drawdown) are not
//! errors; the metrics layer resolves them to sentinel values.

use chrono::NaiveDate;
use thiserror::Error;

/// Invalid simulation parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial capital must be positive, got {0}")]
    NonPositiveCapital(f64),

    #[error("breakeven trigger must be >= 0, got {0}")]
    NegativeBreakevenTrigger(f64),

    #[error("partial exit rule #{index}: gain_pct must be positive, got {gain_pct}")]
    NonPositiveGainPct { index: usize, gain_pct: f64 },

    #[error("partial exit rule #{index}: size_pct must be in (0, 1], got {size_pct}")]
    SizePctOutOfRange { index: usize, size_pct: f64 },

    #[error("duplicate partial exit gain_pct {0}")]
    DuplicateGainPct(f64),

    #[error("RSI period must be >= 1")]
    ZeroRsiPeriod,

    #[error("RSI threshold must be within [0, 100], got {0}")]
    RsiThresholdOutOfRange(f64),
}

/// Price field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        };
        f.write_str(name)
    }
}

/// Invalid bar sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("need at least 2 bars to simulate, got {len}")]
    InsufficientBars { len: usize },

    #[error("bar {index} ({date}): {field} must be a positive finite price, got {value}")]
    NonPositivePrice {
        index: usize,
        date: NaiveDate,
        field: PriceField,
        value: f64,
    },

    #[error("bar {index}: date {date} does not follow previous date {previous}")]
    NonMonotonicDates {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },
}

/// Anything that aborts a simulation before it starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Invalid resampling request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    #[error("resample span must be at least one day")]
    ZeroSpan,

    #[error("bar {index}: date {date} does not follow previous date {previous}")]
    Unordered {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },
}
