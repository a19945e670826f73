//! Domain types for ExitLab

pub mod bar;
pub mod fill;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use bar::{validate_bars, Bar, Signal};
pub use fill::{Fill, FillKind};
pub use portfolio::PortfolioState;
pub use position::{Position, PositionState};
pub use trade::RoundTrip;
