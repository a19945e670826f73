//! RoundTrip: one position lifecycle, from entry fill to final exit fill.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A position's life summarized from the fill log.
///
/// A position may leave through several fills (take-profit rungs followed by
/// a stop or signal exit); `proceeds` sums all of them. Positions still open
/// at the end of the run have `exit_date == None` and are marked to the last
/// close in `proceeds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: f64,
    /// Cash committed at entry.
    pub invested: f64,
    pub exit_bar: Option<usize>,
    pub exit_date: Option<NaiveDate>,
    /// Number of exit fills.
    pub exit_fills: usize,
    pub proceeds: f64,
    /// Label of the fill that closed the position (e.g. `stop_loss`).
    pub closed_by: Option<String>,
    /// Worst low relative to entry while held, as a fraction (<= 0).
    pub mae: f64,
    /// Best high relative to entry while held, as a fraction (>= 0).
    pub mfe: f64,
}

impl RoundTrip {
    pub fn pnl(&self) -> f64 {
        self.proceeds - self.invested
    }

    /// Return on the trade as a fraction of invested cash.
    pub fn return_pct(&self) -> f64 {
        if self.invested == 0.0 {
            return 0.0;
        }
        self.pnl() / self.invested
    }

    pub fn is_open(&self) -> bool {
        self.exit_date.is_none()
    }

    pub fn is_winner(&self) -> bool {
        self.pnl() > 0.0
    }
}
