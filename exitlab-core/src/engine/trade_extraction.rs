//! Trade extraction: folds the fill log into round-trip records.
//!
//! Post-processes fills after the bar loop completes. Pure function:
//! fills + bar data → round trips.

use chrono::NaiveDate;

use crate::domain::{Bar, Fill, FillKind, RoundTrip};

use super::step::DUST_SHARES;

/// A position being tracked during extraction.
struct OpenTrip {
    entry_bar: usize,
    entry_date: NaiveDate,
    entry_price: f64,
    shares: f64,
    remaining: f64,
    invested: f64,
    proceeds: f64,
    exit_fills: usize,
}

impl OpenTrip {
    fn from_entry(fill: &Fill) -> Self {
        Self {
            entry_bar: fill.bar_index,
            entry_date: fill.date,
            entry_price: fill.price,
            shares: fill.shares,
            remaining: fill.shares,
            invested: -fill.cash_delta,
            proceeds: 0.0,
            exit_fills: 0,
        }
    }

    fn finish(self, exit: Option<&Fill>, bars: &[Bar]) -> RoundTrip {
        let last_bar = exit.map_or(bars.len().saturating_sub(1), |f| f.bar_index);
        let (mae, mfe) = excursions(bars, self.entry_bar, last_bar, self.entry_price);
        RoundTrip {
            entry_bar: self.entry_bar,
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            shares: self.shares,
            invested: self.invested,
            exit_bar: exit.map(|f| f.bar_index),
            exit_date: exit.map(|f| f.date),
            exit_fills: self.exit_fills,
            proceeds: self.proceeds,
            closed_by: exit.map(|f| f.kind.label()),
            mae,
            mfe,
        }
    }
}

/// Group fills into round trips, in entry order.
///
/// A position closes on a stop-loss or signal exit, or once take-profit
/// sales exhaust its shares. A position still open after the last fill is
/// marked to the final close and reported with `exit_date == None`.
pub fn extract_round_trips(fills: &[Fill], bars: &[Bar]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<OpenTrip> = None;

    for fill in fills {
        if fill.kind.is_entry() {
            if let Some(stale) = open.take() {
                // Unreachable for engine fill logs: entries only happen while flat.
                trips.push(stale.finish(None, bars));
            }
            open = Some(OpenTrip::from_entry(fill));
            continue;
        }

        let Some(mut trip) = open.take() else {
            continue;
        };
        trip.proceeds += fill.cash_delta;
        trip.remaining -= fill.shares;
        trip.exit_fills += 1;

        let closes = matches!(fill.kind, FillKind::StopLoss | FillKind::SignalExit)
            || trip.remaining <= DUST_SHARES;
        if closes {
            trips.push(trip.finish(Some(fill), bars));
        } else {
            open = Some(trip);
        }
    }

    if let Some(mut trip) = open {
        if let Some(last) = bars.last() {
            trip.proceeds += trip.remaining * last.close;
        }
        trips.push(trip.finish(None, bars));
    }

    trips
}

/// Maximum adverse and favorable excursion over `[entry_bar, exit_bar]`,
/// measured on lows and highs relative to the entry price.
fn excursions(bars: &[Bar], entry_bar: usize, exit_bar: usize, entry_price: f64) -> (f64, f64) {
    let start = entry_bar.min(bars.len());
    let end = (exit_bar + 1).min(bars.len());

    bars[start..end].iter().fold((0.0_f64, 0.0_f64), |(mae, mfe), bar| {
        (
            mae.min(bar.low / entry_price - 1.0),
            mfe.max(bar.high / entry_price - 1.0),
        )
    })
}
