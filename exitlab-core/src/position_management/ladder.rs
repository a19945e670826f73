//! Partial take-profit ladder.
//!
//! A ladder is a fixed set of rungs, each selling a fraction of the
//! *initial* position once unrealized gain reaches the rung's threshold.
//! Rungs are stored highest threshold first, and a rung's [`RuleId`] is its
//! index in that order.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One partial exit rung: at `gain_pct` unrealized gain, sell `size_pct` of
/// the initial position value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialExitRule {
    pub gain_pct: f64,
    pub size_pct: f64,
}

impl PartialExitRule {
    pub fn new(gain_pct: f64, size_pct: f64) -> Self {
        Self { gain_pct, size_pct }
    }

    /// Theoretical fill price for this rung.
    pub fn target_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + self.gain_pct)
    }
}

/// Identity of a rung within a validated ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub usize);

/// Validated rungs, sorted by descending `gain_pct`.
///
/// Serializes as a plain list of rules; deserializing re-validates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitLadder {
    rules: Vec<PartialExitRule>,
}

impl ExitLadder {
    /// Validate and sort a caller-supplied rule set.
    ///
    /// Rejects non-positive gains, sizes outside `(0, 1]` and duplicate gain
    /// thresholds. Indices in errors refer to the caller's order.
    pub fn new(rules: &[PartialExitRule]) -> Result<Self, ConfigError> {
        for (index, rule) in rules.iter().enumerate() {
            if !(rule.gain_pct.is_finite() && rule.gain_pct > 0.0) {
                return Err(ConfigError::NonPositiveGainPct {
                    index,
                    gain_pct: rule.gain_pct,
                });
            }
            if !(rule.size_pct > 0.0 && rule.size_pct <= 1.0) {
                return Err(ConfigError::SizePctOutOfRange {
                    index,
                    size_pct: rule.size_pct,
                });
            }
        }

        let mut sorted = rules.to_vec();
        sorted.sort_by(|a, b| b.gain_pct.total_cmp(&a.gain_pct));
        if let Some(pair) = sorted.windows(2).find(|w| w[0].gain_pct == w[1].gain_pct) {
            return Err(ConfigError::DuplicateGainPct(pair[0].gain_pct));
        }

        Ok(Self { rules: sorted })
    }

    /// Ladder with no rungs.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn get(&self, id: RuleId) -> Option<&PartialExitRule> {
        self.rules.get(id.0)
    }

    /// Rungs in evaluation order (highest threshold first).
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &PartialExitRule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i), r))
    }

    pub fn rules(&self) -> &[PartialExitRule] {
        &self.rules
    }
}

impl<'de> Deserialize<'de> for ExitLadder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rules = Vec::<PartialExitRule>::deserialize(deserializer)?;
        ExitLadder::new(&rules).map_err(serde::de::Error::custom)
    }
}

impl Serialize for ExitLadder {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.rules.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_rules() -> Vec<PartialExitRule> {
        vec![
            PartialExitRule::new(0.30, 0.30),
            PartialExitRule::new(0.70, 0.30),
            PartialExitRule::new(1.20, 0.30),
        ]
    }

    #[test]
    fn ladder_sorts_highest_first() {
        let ladder = ExitLadder::new(&default_rules()).unwrap();
        let gains: Vec<f64> = ladder.iter().map(|(_, r)| r.gain_pct).collect();
        assert_eq!(gains, vec![1.20, 0.70, 0.30]);
        assert_eq!(ladder.get(RuleId(2)).unwrap().gain_pct, 0.30);
    }

    #[test]
    fn ladder_rejects_duplicates() {
        let rules = vec![PartialExitRule::new(0.3, 0.3), PartialExitRule::new(0.3, 0.5)];
        assert_eq!(
            ExitLadder::new(&rules),
            Err(ConfigError::DuplicateGainPct(0.3))
        );
    }

    #[test]
    fn ladder_rejects_bad_sizes() {
        let rules = vec![PartialExitRule::new(0.3, 0.0)];
        assert!(matches!(
            ExitLadder::new(&rules),
            Err(ConfigError::SizePctOutOfRange { index: 0, .. })
        ));
        let rules = vec![PartialExitRule::new(0.3, 0.5), PartialExitRule::new(0.5, 1.5)];
        assert!(matches!(
            ExitLadder::new(&rules),
            Err(ConfigError::SizePctOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn ladder_accepts_full_size_rung() {
        let ladder = ExitLadder::new(&[PartialExitRule::new(0.5, 1.0)]).unwrap();
        assert_eq!(ladder.len(), 1);
    }

    #[test]
    fn ladder_rejects_non_positive_gain() {
        let rules = vec![PartialExitRule::new(-0.1, 0.3)];
        assert!(matches!(
            ExitLadder::new(&rules),
            Err(ConfigError::NonPositiveGainPct { index: 0, .. })
        ));
    }

    #[test]
    fn target_price_uses_threshold() {
        let rule = PartialExitRule::new(0.30, 0.30);
        assert!((rule.target_price(100.0) - 130.0).abs() < 1e-10);
    }

    #[test]
    fn ladder_deserialize_validates() {
        let ok: ExitLadder =
            serde_json::from_str(r#"[{"gain_pct":0.3,"size_pct":0.3},{"gain_pct":0.7,"size_pct":0.3}]"#)
                .unwrap();
        assert_eq!(ok.rules()[0].gain_pct, 0.7);

        let bad: Result<ExitLadder, _> =
            serde_json::from_str(r#"[{"gain_pct":0.3,"size_pct":0.3},{"gain_pct":0.3,"size_pct":0.3}]"#);
        assert!(bad.is_err());
    }
}
