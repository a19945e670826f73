//! PortfolioState: per-bar snapshot of cash and holdings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Snapshot produced exactly once per bar.
///
/// The accounting identity `total_value == cash + holdings_value` holds for
/// every snapshot; constructors compute `total_value` rather than accept it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub date: NaiveDate,
    pub cash: f64,
    pub holdings_value: f64,
    pub total_value: f64,
    /// Shares held at the close.
    pub shares: f64,
    /// Entry fills on this bar.
    pub entries: u32,
    /// Exit fills on this bar (stop, each take-profit rung, signal exit).
    pub exits: u32,
}

impl PortfolioState {
    /// Baseline snapshot: all cash, nothing traded.
    pub fn baseline(date: NaiveDate, initial_capital: f64) -> Self {
        Self::mark(date, initial_capital, 0.0, 0.0, 0, 0)
    }

    /// Mark-to-market at `close`.
    pub fn mark(
        date: NaiveDate,
        cash: f64,
        shares: f64,
        close: f64,
        entries: u32,
        exits: u32,
    ) -> Self {
        let holdings_value = shares * close;
        Self {
            date,
            cash,
            holdings_value,
            total_value: cash + holdings_value,
            shares,
            entries,
            exits,
        }
    }

    /// Net trade counter change on this bar: +1 per entry, -1 per exit.
    pub fn trade_delta(&self) -> i64 {
        i64::from(self.entries) - i64::from(self.exits)
    }
}
