//! Simulation engine: an explicit fold of [`step`] over the bar series.
//!
//! Each bar after the baseline applies, in order: stop-loss, breakeven
//! ratchet, partial take-profits, signal exit, then entry. The fold carries
//! only cash and the tagged position state; everything else is recomputed.

pub mod loop_runner;
pub mod state;
pub mod step;
pub mod trade_extraction;

pub use loop_runner::run_simulation;
pub use state::{BarOutcome, EngineState, SimulationConfig, SimulationResult};
pub use step::{step, DUST_SHARES};
pub use trade_extraction::extract_round_trips;
