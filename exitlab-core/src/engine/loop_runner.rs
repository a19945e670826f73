//! Bar-by-bar fold over the whole series.

use tracing::debug;

use crate::domain::{validate_bars, Bar, PortfolioState};
use crate::error::SimulationError;

use super::state::{EngineState, SimulationConfig, SimulationResult};
use super::step::step;

/// Run the layered-exit simulation over `bars`.
///
/// Configuration and data are validated before the first bar; on error no
/// snapshot is produced. Bar 0 is a baseline (all cash, no rules run), so a
/// signal on the first bar is ignored.
pub fn run_simulation(
    bars: &[Bar],
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    validate_bars(bars)?;

    let mut states = Vec::with_capacity(bars.len());
    let mut fills = Vec::new();
    let mut state = EngineState::new(config.initial_capital);

    states.push(PortfolioState::baseline(bars[0].date, config.initial_capital));

    for (bar_index, bar) in bars.iter().enumerate().skip(1) {
        let outcome = step(&state, bar, bar_index, config);
        state = outcome.state;
        states.push(outcome.portfolio);
        fills.extend(outcome.fills);
    }

    debug!(
        bars = bars.len(),
        fills = fills.len(),
        final_value = states.last().map_or(0.0, |s| s.total_value),
        "simulation complete"
    );

    Ok(SimulationResult {
        states,
        fills,
        final_state: state,
    })
}
