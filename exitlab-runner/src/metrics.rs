//! Performance metrics: pure functions over a finished simulation.
//!
//! Every metric is a pure function: equity curve and/or bars in, scalar out.
//! Degenerate inputs (flat equity, zero elapsed time, zero drawdown) resolve
//! to sentinel values rather than errors so reporting never fails on short
//! or quiet runs.

use exitlab_core::domain::{Bar, PortfolioState};
use serde::{Deserialize, Serialize};

/// Trading days per year used to annualize per-bar statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calendar days per year used for CAGR.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Aggregate performance metrics for a single backtest run.
///
/// `calmar` is `+inf` when the run never drew down; non-finite values
/// serialize as the strings `"inf"`, `"-inf"` and `"NaN"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    #[serde(with = "non_finite")]
    pub sharpe: f64,
    pub max_drawdown: f64,
    #[serde(with = "non_finite")]
    pub calmar: f64,
    pub trade_count: usize,
    pub buy_and_hold_return: f64,
}

/// Computes [`PerformanceMetrics`] with explicit capital and annualization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsCalculator {
    initial_capital: f64,
    periods_per_year: f64,
}

impl MetricsCalculator {
    pub fn new(initial_capital: f64, periods_per_year: f64) -> Self {
        Self {
            initial_capital,
            periods_per_year,
        }
    }

    /// Annualization for bars spanning `bar_span_days` trading days each
    /// (3-day bars → 84 periods per year).
    pub fn for_bar_span(initial_capital: f64, bar_span_days: u32) -> Self {
        Self::new(
            initial_capital,
            TRADING_DAYS_PER_YEAR / f64::from(bar_span_days.max(1)),
        )
    }

    pub fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    pub fn compute(&self, states: &[PortfolioState], bars: &[Bar]) -> PerformanceMetrics {
        let equity: Vec<f64> = states.iter().map(|s| s.total_value).collect();
        let days = match (states.first(), states.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days(),
            _ => 0,
        };

        let total_return = total_return(&equity, self.initial_capital);
        let cagr = cagr(&equity, self.initial_capital, days);
        let max_drawdown = max_drawdown(&equity);

        PerformanceMetrics {
            total_return,
            cagr,
            sharpe: sharpe_ratio(&equity, self.periods_per_year),
            max_drawdown,
            calmar: calmar_ratio(cagr, max_drawdown),
            trade_count: trade_count(states),
            buy_and_hold_return: buy_and_hold_return(bars),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction of initial capital.
pub fn total_return(equity_curve: &[f64], initial_capital: f64) -> f64 {
    match equity_curve.last() {
        Some(&final_eq) if initial_capital > 0.0 => final_eq / initial_capital - 1.0,
        _ => 0.0,
    }
}

/// Compound Annual Growth Rate over `days` calendar days.
///
/// A run spanning zero (or negative) days is treated as one year.
pub fn cagr(equity_curve: &[f64], initial_capital: f64, days: i64) -> f64 {
    let Some(&final_eq) = equity_curve.last() else {
        return 0.0;
    };
    if initial_capital <= 0.0 {
        return 0.0;
    }
    let years = if days > 0 {
        days as f64 / DAYS_PER_YEAR
    } else {
        1.0
    };
    (final_eq / initial_capital).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio from per-bar returns (risk-free rate 0).
///
/// Sharpe = mean * f / (std * sqrt(f)), sample std. The leading zero return
/// of the first bar takes part in both statistics. Returns 0.0 when the
/// standard deviation vanishes.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = bar_returns(equity_curve);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&returns) * periods_per_year) / (std * periods_per_year.sqrt())
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    drawdown_series(equity_curve)
        .into_iter()
        .fold(0.0_f64, f64::min)
}

/// Calmar ratio: CAGR / |max_drawdown|, `+inf` when there was no drawdown.
pub fn calmar_ratio(cagr: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        return f64::INFINITY;
    }
    cagr / max_drawdown.abs()
}

/// Number of bars on which the net trade counter rose (a position opened
/// without an exit on the same bar).
///
/// A bar that closes one position and opens another nets to zero and is not
/// counted, so a same-bar re-entry does not add to the total.
pub fn trade_count(states: &[PortfolioState]) -> usize {
    states.iter().filter(|s| s.trade_delta() > 0).count()
}

/// Passive benchmark: last close over first close.
pub fn buy_and_hold_return(bars: &[Bar]) -> f64 {
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) if first.close > 0.0 => last.close / first.close - 1.0,
        _ => 0.0,
    }
}

// ─── Series ─────────────────────────────────────────────────────────

/// Per-bar percentage change; the first bar's return is 0 and a zero
/// previous value yields 0.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    if equity_curve.is_empty() {
        return Vec::new();
    }
    std::iter::once(0.0)
        .chain(equity_curve.windows(2).map(|w| {
            if w[0] != 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        }))
        .collect()
}

/// Drawdown from the running peak at each bar (<= 0).
pub fn drawdown_series(equity_curve: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|&eq| {
            peak = peak.max(eq);
            if peak > 0.0 {
                (eq - peak) / peak
            } else {
                0.0
            }
        })
        .collect()
}

/// Value of `initial_capital` invested at the first close and held.
pub fn buy_and_hold_equity(bars: &[Bar], initial_capital: f64) -> Vec<f64> {
    let Some(first) = bars.first() else {
        return Vec::new();
    };
    let shares = initial_capital / first.close;
    bars.iter().map(|b| shares * b.close).collect()
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Serde adapter keeping non-finite floats representable in JSON.
pub mod non_finite {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            "NaN".serialize(serializer)
        } else if *value == f64::INFINITY {
            "inf".serialize(serializer)
        } else if *value == f64::NEG_INFINITY {
            "-inf".serialize(serializer)
        } else {
            value.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) => match s.as_str() {
                "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
                "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
                "NaN" | "nan" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "expected a number, \"inf\", \"-inf\" or \"NaN\", got {other:?}"
                ))),
            },
        }
    }
}
