//! Signal generation: annotate bars with Buy/Sell/Hold from market data only.
//!
//! Signals must NEVER depend on portfolio state (cash, shares, stops).
//! They represent pure market timing logic based on OHLC data only.

pub mod rsi_crossover;

pub use rsi_crossover::RsiCrossover;

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Bars annotated with signals, warmup removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    /// Bars with `signal` set; starts at the first bar with a defined indicator.
    pub bars: Vec<Bar>,
    /// Indicator value for each kept bar.
    pub indicator: Vec<f64>,
    /// Leading bars dropped because the indicator was undefined.
    pub warmup_dropped: usize,
}

/// Portfolio-agnostic signal generator
///
/// # Invariants
/// - `generate()` MUST NOT access portfolio state
/// - `generate()` MUST be deterministic for the same bar sequence
pub trait SignalGenerator: Send + Sync {
    /// Signal name for manifest/logging
    fn name(&self) -> &str;

    /// Number of leading bars without a defined signal.
    fn warmup(&self) -> usize;

    fn generate(&self, bars: &[Bar]) -> SignalSeries;
}
