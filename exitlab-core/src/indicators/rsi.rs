//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses, seeded with
//! the simple average of the first `period` changes.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: no movement → 50; avg_loss == 0 → 100; avg_gain == 0 → 0.

use super::Indicator;
use crate::domain::Bar;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::ZeroRsiPeriod);
        }
        Ok(Self {
            period,
            name: format!("rsi_{period}"),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period + 1 {
            return result;
        }

        let changes: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();

        // Seed: average gain and average loss over first `period` changes
        let (mut avg_gain, mut avg_loss) =
            changes[..self.period]
                .iter()
                .fold((0.0, 0.0), |(g, l), &ch| {
                    if ch > 0.0 {
                        (g + ch, l)
                    } else {
                        (g, l - ch)
                    }
                });
        avg_gain /= self.period as f64;
        avg_loss /= self.period as f64;

        result[self.period] = compute_rsi(avg_gain, avg_loss);

        let alpha = 1.0 / self.period as f64;
        for (i, &ch) in changes.iter().enumerate().skip(self.period) {
            let gain = ch.max(0.0);
            let loss = (-ch).max(0.0);

            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

            // changes[i] is the move into bar i + 1
            result[i + 1] = compute_rsi(avg_gain, avg_loss);
        }

        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let result = Rsi::new(3).unwrap().compute(&bars);
        assert_approx(result[3], 100.0, 1e-6);
        assert_approx(result[5], 100.0, 1e-6);
    }

    #[test]
    fn rsi_all_losses() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let result = Rsi::new(3).unwrap().compute(&bars);
        assert_approx(result[3], 0.0, 1e-6);
    }

    #[test]
    fn rsi_flat_series_is_neutral() {
        let bars = make_bars(&[50.0; 6]);
        let result = Rsi::new(3).unwrap().compute(&bars);
        assert_approx(result[4], 50.0, 1e-12);
    }

    #[test]
    fn rsi_mixed() {
        // Changes: +0.34, -0.25, -0.48, +0.72
        // period=3 seed: avg_gain = 0.34/3, avg_loss = 0.73/3
        // RSI[3] = 100 - 100/(1 + 0.34/0.73)
        let bars = make_bars(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let result = Rsi::new(3).unwrap().compute(&bars);

        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);

        // Wilder step for the +0.72 move
        let g = (0.34 / 3.0) * (2.0 / 3.0) + 0.72 / 3.0;
        let l = (0.73 / 3.0) * (2.0 / 3.0);
        assert_approx(result[4], 100.0 - 100.0 / (1.0 + g / l), 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        let bars = make_bars(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        let result = Rsi::new(3).unwrap().compute(&bars);
        for (i, &v) in result.iter().enumerate().skip(3) {
            assert!((0.0..=100.0).contains(&v), "RSI out of bounds at bar {i}: {v}");
        }
    }

    #[test]
    fn rsi_short_series_is_all_warmup() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let result = Rsi::new(3).unwrap().compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_rejects_zero_period() {
        assert_eq!(Rsi::new(0).unwrap_err(), ConfigError::ZeroRsiPeriod);
        assert_eq!(Rsi::new(14).unwrap().lookback(), 14);
    }

    #[test]
    fn rsi_has_no_lookahead() {
        let closes = [10.0, 11.0, 10.5, 12.0, 11.0, 13.0, 12.5, 14.0];
        let full = Rsi::new(3).unwrap().compute(&make_bars(&closes));
        let truncated = Rsi::new(3).unwrap().compute(&make_bars(&closes[..6]));
        for i in 3..6 {
            assert_approx(truncated[i], full[i], 1e-12);
        }
    }
}
