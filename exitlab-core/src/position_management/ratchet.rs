/// Stop-loss ratchet for long positions.
///
/// **Core rule:** the stop may rise, never fall.
///
/// A fresh position has no stop at all. The breakeven rule is the only thing
/// that arms it, and once armed at the entry price the level cannot be moved
/// back down for the rest of the position's life.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StopRatchet {
    level: Option<f64>,
}

impl StopRatchet {
    /// Unarmed stop.
    pub fn disarmed() -> Self {
        Self { level: None }
    }

    /// Raise the stop to `proposed` if that tightens it.
    ///
    /// Returns the effective level after the ratchet is applied.
    ///
    /// # Example
    /// ```
    /// use exitlab_core::position_management::StopRatchet;
    ///
    /// let mut stop = StopRatchet::disarmed();
    /// assert_eq!(stop.raise(100.0), 100.0);
    /// // Loosening is ignored.
    /// assert_eq!(stop.raise(90.0), 100.0);
    /// ```
    pub fn raise(&mut self, proposed: f64) -> f64 {
        let next = match self.level {
            Some(current) => current.max(proposed),
            None => proposed,
        };
        self.level = Some(next);
        next
    }

    pub fn level(&self) -> Option<f64> {
        self.level
    }

    pub fn is_armed(&self) -> bool {
        self.level.is_some()
    }

    /// True when the stop is unset or sits below `price`.
    pub fn is_below(&self, price: f64) -> bool {
        self.level.map_or(true, |level| level < price)
    }

    /// The price this stop fills at if the bar's low touches it.
    pub fn triggered_by(&self, low: f64) -> Option<f64> {
        self.level.filter(|&level| low <= level)
    }
}
