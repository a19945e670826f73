//! ExitLab Core: domain types, exit rules, the simulation fold, RSI signals.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (bars, signals, positions, fills, portfolio snapshots, round trips)
//! - Exit rule configuration (take-profit ladder, ratcheting stop)
//! - Bar-by-bar simulation as an explicit fold over `step`
//! - RSI indicator and the RSI crossover signal generator
//! - Calendar resampling of daily bars

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod position_management;
pub mod signals;

pub use error::{ConfigError, DataError, ResampleError, SimulationError};
