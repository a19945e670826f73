//! Bar: the fundamental market data unit, carrying its trading signal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, PriceField};

/// Discrete trading impulse attached to a bar by the signal generator.
///
/// Serialized as its integer value (-1, 0, 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    Sell,
    #[default]
    Hold,
    Buy,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Sell => -1,
            Signal::Hold => 0,
            Signal::Buy => 1,
        }
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.as_i8()
    }
}

impl TryFrom<i8> for Signal {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Signal::Sell),
            0 => Ok(Signal::Hold),
            1 => Ok(Signal::Buy),
            other => Err(format!("signal must be -1, 0 or 1, got {other}")),
        }
    }
}

/// OHLCV bar for one simulation period (a day, or a multi-day window after
/// resampling).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub signal: Signal,
}

impl Bar {
    /// Bar with no signal attached.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            signal: Signal::Hold,
        }
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = signal;
        self
    }

    /// Basic OHLC consistency: high is the top of the range, low the bottom.
    ///
    /// Not enforced by the engine; loaders use it to flag suspicious rows.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Every OHLC price must be positive and finite.
    pub fn check_prices(&self, index: usize) -> Result<(), DataError> {
        let fields = [
            (PriceField::Open, self.open),
            (PriceField::High, self.high),
            (PriceField::Low, self.low),
            (PriceField::Close, self.close),
        ];
        for (field, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(DataError::NonPositivePrice {
                    index,
                    date: self.date,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Validate a bar sequence for simulation: at least two bars, positive
/// prices, strictly increasing dates.
pub fn validate_bars(bars: &[Bar]) -> Result<(), DataError> {
    if bars.len() < 2 {
        return Err(DataError::InsufficientBars { len: bars.len() });
    }
    for (i, bar) in bars.iter().enumerate() {
        bar.check_prices(i)?;
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(DataError::NonMonotonicDates {
                index: i,
                previous: bars[i - 1].date,
                date: bar.date,
            });
        }
    }
    Ok(())
}
