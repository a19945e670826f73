//! Property tests for metric invariants over random equity curves.
//!
//! 1. Drawdown is never positive and never below -100% for positive curves
//! 2. Calmar is `+inf` exactly when the curve never drew down
//! 3. Per-bar returns line up with the curve and start at 0
//! 4. Sharpe is always finite

use exitlab_runner::metrics::{
    bar_returns, cagr, calmar_ratio, drawdown_series, max_drawdown, sharpe_ratio,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Positive equity curve built from bounded per-bar returns.
fn arb_equity() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.3..0.3_f64, 1..120).prop_map(|rets| {
        let mut value = 100_000.0;
        rets.into_iter()
            .map(|r| {
                value *= 1.0 + r;
                value
            })
            .collect()
    })
}

/// Non-decreasing equity curve.
fn arb_rising_equity() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0..0.1_f64, 1..60).prop_map(|rets| {
        let mut value = 100.0;
        rets.into_iter()
            .map(|r| {
                value *= 1.0 + r;
                value
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn drawdown_is_bounded(eq in arb_equity()) {
        let mdd = max_drawdown(&eq);
        prop_assert!(mdd <= 0.0);
        prop_assert!(mdd >= -1.0);

        let dd = drawdown_series(&eq);
        prop_assert_eq!(dd.len(), eq.len());
        prop_assert!(dd.iter().all(|&d| d <= 0.0 && d >= mdd));
        prop_assert_eq!(dd[0], 0.0);
    }

    #[test]
    fn calmar_infinite_iff_no_drawdown(eq in arb_equity(), days in 1i64..5_000) {
        let mdd = max_drawdown(&eq);
        let calmar = calmar_ratio(cagr(&eq, 100_000.0, days), mdd);
        prop_assert_eq!(calmar == f64::INFINITY, mdd == 0.0);
        if mdd != 0.0 {
            prop_assert!(calmar.is_finite());
        }
    }

    #[test]
    fn rising_curve_never_draws_down(eq in arb_rising_equity()) {
        prop_assert_eq!(max_drawdown(&eq), 0.0);
        prop_assert_eq!(calmar_ratio(0.1, max_drawdown(&eq)), f64::INFINITY);
    }

    #[test]
    fn returns_start_at_zero(eq in arb_equity()) {
        let r = bar_returns(&eq);
        prop_assert_eq!(r.len(), eq.len());
        prop_assert_eq!(r[0], 0.0);
        for (i, w) in eq.windows(2).enumerate() {
            prop_assert!((r[i + 1] - (w[1] / w[0] - 1.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn sharpe_is_finite(eq in arb_equity(), span in 1u32..10) {
        let s = sharpe_ratio(&eq, 252.0 / f64::from(span));
        prop_assert!(s.is_finite());
    }
}
