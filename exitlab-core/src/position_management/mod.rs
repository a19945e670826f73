//! Exit rule building blocks.
//!
//! - [`StopRatchet`]: a long-side stop that only tightens (breakeven rule)
//! - [`ExitLadder`]: validated partial take-profit rungs

pub mod ladder;
pub mod ratchet;

pub use ladder::{ExitLadder, PartialExitRule, RuleId};
pub use ratchet::StopRatchet;
