//! Engine configuration, per-bar state, and run result types.

use serde::{Deserialize, Serialize};

use crate::domain::{Fill, PortfolioState, PositionState};
use crate::error::ConfigError;
use crate::position_management::{ExitLadder, PartialExitRule};

/// Parameters for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Unrealized gain (fraction of entry) that moves the stop to entry.
    /// `None` disables the breakeven rule.
    pub breakeven_trigger_pct: Option<f64>,
    pub ladder: ExitLadder,
}

impl SimulationConfig {
    /// Build and validate a config from raw rules.
    pub fn new(
        initial_capital: f64,
        breakeven_trigger_pct: Option<f64>,
        rules: &[PartialExitRule],
    ) -> Result<Self, ConfigError> {
        let config = Self {
            initial_capital,
            breakeven_trigger_pct,
            ladder: ExitLadder::new(rules)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// No breakeven, no ladder: enter on Buy, leave on Sell.
    pub fn signal_only(initial_capital: f64) -> Result<Self, ConfigError> {
        Self::new(initial_capital, None, &[])
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if let Some(trigger) = self.breakeven_trigger_pct {
            // NaN fails this comparison too. +inf is accepted and never fires.
            if !(trigger >= 0.0) {
                return Err(ConfigError::NegativeBreakevenTrigger(trigger));
            }
        }
        Ok(())
    }

    /// True when an unrealized gain of `gain` reaches the breakeven trigger.
    pub fn breakeven_reached(&self, gain: f64) -> bool {
        self.breakeven_trigger_pct
            .map_or(false, |trigger| gain >= trigger)
    }
}

/// State carried from one bar to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub cash: f64,
    pub position: PositionState,
}

impl EngineState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            position: PositionState::Flat,
        }
    }
}

/// Everything produced by [`step`](super::step::step) for one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarOutcome {
    pub state: EngineState,
    pub portfolio: PortfolioState,
    pub fills: Vec<Fill>,
}

/// Complete output of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// One snapshot per input bar.
    pub states: Vec<PortfolioState>,
    /// All fills in execution order.
    pub fills: Vec<Fill>,
    /// Engine state after the last bar.
    pub final_state: EngineState,
}

impl SimulationResult {
    pub fn final_value(&self) -> f64 {
        self.states.last().map_or(0.0, |s| s.total_value)
    }
}
