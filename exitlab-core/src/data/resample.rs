//! Calendar resampling of daily bars into N-day bars.
//!
//! Bins are anchored at the first bar's date: a bar falls into bin
//! `days_since_first / span`. Aggregation is open = first, high = max,
//! low = min, close = last, volume = sum; the output bar is dated at the
//! bin start. Bins with no bars are skipped.

use chrono::NaiveDate;

use crate::domain::Bar;
use crate::error::ResampleError;

/// Resample ascending daily bars into `span_days`-day bars.
///
/// Input signals are discarded; signals are generated on the resampled
/// series. `span_days == 1` still normalizes dates to bin starts, which for
/// daily input is the identity.
pub fn resample(bars: &[Bar], span_days: u32) -> Result<Vec<Bar>, ResampleError> {
    if span_days == 0 {
        return Err(ResampleError::ZeroSpan);
    }
    for (index, pair) in bars.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(ResampleError::Unordered {
                index: index + 1,
                previous: pair[0].date,
                date: pair[1].date,
            });
        }
    }

    let Some(first) = bars.first() else {
        return Ok(Vec::new());
    };
    let origin = first.date;
    let span = i64::from(span_days);

    let mut out: Vec<Bar> = Vec::new();
    let mut current_bin: Option<i64> = None;

    for bar in bars {
        let bin = (bar.date - origin).num_days() / span;
        match out.last_mut() {
            Some(agg) if current_bin == Some(bin) => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                current_bin = Some(bin);
                out.push(Bar::new(
                    bin_start(origin, bin, span),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                ));
            }
        }
    }

    Ok(out)
}

fn bin_start(origin: NaiveDate, bin: i64, span: i64) -> NaiveDate {
    origin + chrono::Duration::days(bin * span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Signal;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    fn daily(day: u32, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(d(day), o, h, l, c, 100.0)
    }

    #[test]
    fn aggregates_three_day_bins() {
        let bars = vec![
            daily(1, 10.0, 12.0, 9.0, 11.0),
            daily(2, 11.0, 15.0, 10.0, 14.0),
            daily(3, 14.0, 14.5, 8.0, 9.0),
            daily(4, 9.0, 10.0, 8.5, 9.5),
        ];
        let out = resample(&bars, 3).unwrap();
        assert_eq!(out.len(), 2);

        let first = &out[0];
        assert_eq!(first.date, d(1));
        assert_eq!(first.open, 10.0);
        assert_eq!(first.high, 15.0);
        assert_eq!(first.low, 8.0);
        assert_eq!(first.close, 9.0);
        assert_eq!(first.volume, 300.0);

        assert_eq!(out[1].date, d(4));
        assert_eq!(out[1].volume, 100.0);
    }

    #[test]
    fn weekend_gaps_skip_empty_bins() {
        // Fri 5th, then Mon 8th..Thu 11th; 2-day bins anchored on the 5th.
        let bars: Vec<Bar> = [5, 8, 9, 10, 11]
            .iter()
            .map(|&day| daily(day, 10.0, 11.0, 9.0, 10.0))
            .collect();
        let out = resample(&bars, 2).unwrap();
        let dates: Vec<NaiveDate> = out.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(5), d(7), d(9), d(11)]);
        assert_eq!(out[1].volume, 100.0);
        assert_eq!(out[2].volume, 200.0);
    }

    #[test]
    fn discards_input_signals() {
        let bars = vec![daily(1, 1.0, 1.0, 1.0, 1.0).with_signal(Signal::Buy)];
        let out = resample(&bars, 3).unwrap();
        assert_eq!(out[0].signal, Signal::Hold);
    }

    #[test]
    fn zero_span_is_rejected() {
        assert_eq!(resample(&[], 0), Err(ResampleError::ZeroSpan));
    }

    #[test]
    fn unordered_input_is_rejected() {
        let bars = vec![daily(3, 1.0, 1.0, 1.0, 1.0), daily(2, 1.0, 1.0, 1.0, 1.0)];
        assert!(matches!(
            resample(&bars, 3),
            Err(ResampleError::Unordered { index: 1, .. })
        ));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(resample(&[], 3).unwrap().is_empty());
    }
}
