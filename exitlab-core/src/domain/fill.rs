use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::position_management::RuleId;

/// What caused a fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FillKind {
    /// Buy signal while flat; deploys all cash at the close.
    Entry,
    /// Bar low touched the stop; fills at the stop price.
    StopLoss,
    /// Partial take-profit rung; fills at the rung's theoretical price.
    TakeProfit { rule: RuleId, gain_pct: f64 },
    /// Sell signal; liquidates the remainder at the close.
    SignalExit,
}

impl FillKind {
    pub fn is_entry(&self) -> bool {
        matches!(self, FillKind::Entry)
    }

    pub fn label(&self) -> String {
        match self {
            FillKind::Entry => "entry".into(),
            FillKind::StopLoss => "stop_loss".into(),
            FillKind::TakeProfit { gain_pct, .. } => {
                format!("take_profit_{:.0}", gain_pct * 100.0)
            }
            FillKind::SignalExit => "signal_exit".into(),
        }
    }
}

/// Executed trade event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub kind: FillKind,
    pub price: f64,
    pub shares: f64,
    /// Cash change caused by the fill: negative for entries, positive for exits.
    pub cash_delta: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.price * self.shares
    }
}
