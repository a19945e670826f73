//! RSI threshold crossover with an alternation filter.
//!
//! Raw buy: RSI moves from below the threshold to at or above it.
//! Raw sell: RSI moves from above the threshold to at or below it.
//! The filter passes a buy only while out of the market and a sell only
//! while in it, so emitted signals strictly alternate starting with Buy.

use super::{SignalGenerator, SignalSeries};
use crate::domain::{Bar, Signal};
use crate::error::ConfigError;
use crate::indicators::{Indicator, Rsi};

#[derive(Debug, Clone)]
pub struct RsiCrossover {
    rsi: Rsi,
    threshold: f64,
    name: String,
}

impl RsiCrossover {
    pub fn new(period: usize, threshold: f64) -> Result<Self, ConfigError> {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::RsiThresholdOutOfRange(threshold));
        }
        Ok(Self {
            rsi: Rsi::new(period)?,
            threshold,
            name: format!("rsi_crossover_{period}_{threshold}"),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn raw_crossover(&self, prev: f64, curr: f64) -> Signal {
        if prev < self.threshold && curr >= self.threshold {
            Signal::Buy
        } else if prev > self.threshold && curr <= self.threshold {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

impl SignalGenerator for RsiCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.rsi.lookback()
    }

    fn generate(&self, bars: &[Bar]) -> SignalSeries {
        let values = self.rsi.compute(bars);
        let first = values
            .iter()
            .position(|v| !v.is_nan())
            .unwrap_or(bars.len());

        let mut in_market = false;
        let mut prev: Option<f64> = None;
        let mut out = Vec::with_capacity(bars.len() - first);

        for (bar, &rsi) in bars[first..].iter().zip(&values[first..]) {
            let raw = prev.map_or(Signal::Hold, |p| self.raw_crossover(p, rsi));
            prev = Some(rsi);

            let signal = match raw {
                Signal::Buy if !in_market => {
                    in_market = true;
                    Signal::Buy
                }
                Signal::Sell if in_market => {
                    in_market = false;
                    Signal::Sell
                }
                _ => Signal::Hold,
            };
            out.push(bar.clone().with_signal(signal));
        }

        SignalSeries {
            bars: out,
            indicator: values[first..].to_vec(),
            warmup_dropped: first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn signals(series: &SignalSeries) -> Vec<Signal> {
        series.bars.iter().map(|b| b.signal).collect()
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(
            RsiCrossover::new(14, 120.0).unwrap_err(),
            ConfigError::RsiThresholdOutOfRange(120.0)
        );
        assert_eq!(RsiCrossover::new(0, 50.0).unwrap_err(), ConfigError::ZeroRsiPeriod);
    }

    #[test]
    fn warmup_bars_are_dropped() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.0, 10.0, 11.0]);
        let series = RsiCrossover::new(3, 50.0).unwrap().generate(&bars);
        assert_eq!(series.warmup_dropped, 3);
        assert_eq!(series.bars.len(), 3);
        assert_eq!(series.indicator.len(), 3);
        assert_eq!(series.bars[0].date, bars[3].date);
        // First kept bar has no previous RSI to cross from.
        assert_eq!(series.bars[0].signal, Signal::Hold);
    }

    #[test]
    fn short_series_yields_nothing() {
        let bars = make_bars(&[10.0, 11.0]);
        let series = RsiCrossover::new(3, 50.0).unwrap().generate(&bars);
        assert!(series.bars.is_empty());
        assert_eq!(series.warmup_dropped, 2);
    }

    #[test]
    fn crossings_produce_buy_then_sell() {
        // Period 1: RSI is 100 on an up move, 0 on a down move.
        let bars = make_bars(&[10.0, 9.0, 10.0, 11.0, 10.0, 11.0]);
        let series = RsiCrossover::new(1, 50.0).unwrap().generate(&bars);
        assert_eq!(
            signals(&series),
            vec![
                Signal::Hold,
                Signal::Buy,
                Signal::Hold,
                Signal::Sell,
                Signal::Buy
            ]
        );
    }

    #[test]
    fn sell_before_any_buy_is_filtered() {
        let bars = make_bars(&[10.0, 11.0, 10.0, 11.0]);
        let series = RsiCrossover::new(1, 50.0).unwrap().generate(&bars);
        // RSI: 100, 0, 100 → raw Sell then raw Buy; the Sell is suppressed.
        assert_eq!(
            signals(&series),
            vec![Signal::Hold, Signal::Hold, Signal::Buy]
        );
    }

    #[test]
    fn emitted_signals_alternate() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.45).sin())
            .collect();
        let series = RsiCrossover::new(4, 50.0).unwrap().generate(&make_bars(&closes));
        let active: Vec<Signal> = signals(&series)
            .into_iter()
            .filter(|s| *s != Signal::Hold)
            .collect();
        assert!(!active.is_empty());
        assert_eq!(active[0], Signal::Buy);
        for pair in active.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
