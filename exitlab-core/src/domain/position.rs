//! Position lifecycle: `Flat` or `Open(Position)`.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::position_management::{RuleId, StopRatchet};

/// A long position, alive only while capital is deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    /// Shares still held.
    pub shares: f64,
    /// Cash committed at entry. Partial exits are sized from this.
    pub initial_value: f64,
    pub stop: StopRatchet,
    /// Take-profit rungs that already fired for this position.
    pub fired: HashSet<RuleId>,
}

impl Position {
    /// Deploy `cash` at `price`: no stop, no rungs fired.
    pub fn open(entry_bar: usize, entry_date: NaiveDate, cash: f64, price: f64) -> Self {
        Self {
            entry_bar,
            entry_date,
            entry_price: price,
            shares: cash / price,
            initial_value: cash,
            stop: StopRatchet::disarmed(),
            fired: HashSet::new(),
        }
    }

    /// Unrealized gain as a fraction of the entry price.
    pub fn gain_at(&self, price: f64) -> f64 {
        price / self.entry_price - 1.0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn has_fired(&self, rule: RuleId) -> bool {
        self.fired.contains(&rule)
    }

    pub fn stop_loss_price(&self) -> Option<f64> {
        self.stop.level()
    }
}

/// Tagged position state carried from bar to bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Open(Position),
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open(_))
    }

    pub fn as_open(&self) -> Option<&Position> {
        match self {
            PositionState::Open(pos) => Some(pos),
            PositionState::Flat => None,
        }
    }

    /// Shares held (0 when flat).
    pub fn shares(&self) -> f64 {
        self.as_open().map_or(0.0, |p| p.shares)
    }
}
