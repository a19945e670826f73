//! Parameter sweeps over exit rules.
//!
//! A sweep varies only the exit side of a config (breakeven trigger and
//! take-profit ladder), so bars are resampled and signals generated once and
//! shared by every grid point. Points are independent engine runs and can be
//! fanned out across threads with rayon; serial and parallel sweeps return
//! identical results in identical order.

use rayon::prelude::*;
use tracing::info;

use exitlab_core::position_management::PartialExitRule;

use crate::config::{BacktestConfig, ConfigFileError, SweepConfig};
use crate::data_loader::LoadedData;
use crate::runner::{prepare_series, run_prepared, BacktestResult, RunError};

/// One grid point: a label plus the exit parameters it sets.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub label: String,
    pub breakeven_trigger_pct: Option<f64>,
    pub ladder_name: String,
    pub rules: Vec<PartialExitRule>,
}

impl SweepPoint {
    /// The base config with this point's exit parameters applied.
    pub fn apply(&self, base: &BacktestConfig) -> BacktestConfig {
        let mut config = base.clone();
        config.backtest.breakeven_trigger_pct = self.breakeven_trigger_pct;
        config.backtest.partial_exit_rules = self.rules.clone();
        config.sweep = None;
        config
    }
}

/// Cartesian product of breakeven triggers and ladders.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    points: Vec<SweepPoint>,
}

impl SweepGrid {
    /// Build the grid from a sweep section. Empty axes fall back to the base
    /// config's value; a negative trigger means breakeven disabled and a
    /// non-finite one is rejected.
    pub fn from_config(sweep: &SweepConfig, base: &BacktestConfig) -> Result<Self, ConfigFileError> {
        if sweep.is_empty() {
            return Err(ConfigFileError::EmptySweep);
        }
        if let Some(&t) = sweep.breakeven_trigger_pcts.iter().find(|t| !t.is_finite()) {
            return Err(ConfigFileError::NonFiniteSweepTrigger(t));
        }

        let triggers: Vec<Option<f64>> = if sweep.breakeven_trigger_pcts.is_empty() {
            vec![base.backtest.breakeven_trigger_pct]
        } else {
            sweep
                .breakeven_trigger_pcts
                .iter()
                .map(|&t| (t >= 0.0).then_some(t))
                .collect()
        };

        let ladders: Vec<(String, Vec<PartialExitRule>)> = if sweep.ladders.is_empty() {
            vec![("base".to_string(), base.backtest.partial_exit_rules.clone())]
        } else {
            sweep
                .ladders
                .iter()
                .map(|l| (l.name.clone(), l.rules.clone()))
                .collect()
        };

        let mut points = Vec::with_capacity(triggers.len() * ladders.len());
        for &trigger in &triggers {
            for (name, rules) in &ladders {
                let point = SweepPoint {
                    label: format!("be={} ladder={name}", trigger_label(trigger)),
                    breakeven_trigger_pct: trigger,
                    ladder_name: name.clone(),
                    rules: rules.clone(),
                };
                // Reject bad points before any simulation runs.
                point.apply(base).simulation_config()?;
                points.push(point);
            }
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[SweepPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn trigger_label(trigger: Option<f64>) -> String {
    match trigger {
        Some(t) => format!("{:.0}%", t * 100.0),
        None => "off".to_string(),
    }
}

/// One finished grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub point: SweepPoint,
    pub result: BacktestResult,
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResults {
    outcomes: Vec<SweepOutcome>,
}

impl SweepResults {
    pub fn all(&self) -> &[SweepOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcomes ranked by Calmar, then Sharpe, both descending.
    pub fn ranked(&self) -> Vec<&SweepOutcome> {
        let mut sorted: Vec<_> = self.outcomes.iter().collect();
        sorted.sort_by(|a, b| {
            let (ma, mb) = (&a.result.metrics, &b.result.metrics);
            mb.calmar
                .total_cmp(&ma.calmar)
                .then(mb.sharpe.total_cmp(&ma.sharpe))
        });
        sorted
    }

    pub fn best(&self) -> Option<&SweepOutcome> {
        self.ranked().into_iter().next()
    }
}

/// Parameter sweep executor.
#[derive(Debug, Clone, Copy)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every grid point against `loaded` under `base`'s data and strategy settings.
    pub fn run(
        &self,
        grid: &SweepGrid,
        base: &BacktestConfig,
        loaded: &LoadedData,
    ) -> Result<SweepResults, RunError> {
        let series = prepare_series(base, &loaded.bars)?;
        info!(points = grid.len(), parallel = self.parallel, "starting sweep");

        let run_point = |point: &SweepPoint| -> Result<SweepOutcome, RunError> {
            let result = run_prepared(&point.apply(base), loaded, &series)?;
            Ok(SweepOutcome {
                point: point.clone(),
                result,
            })
        };

        let outcomes = if self.parallel {
            grid.points()
                .par_iter()
                .map(run_point)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            grid.points()
                .iter()
                .map(run_point)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults { outcomes })
    }
}
