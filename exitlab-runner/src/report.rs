//! Markdown reports for single runs and sweeps.

use std::collections::BTreeMap;

use exitlab_core::domain::{FillKind, RoundTrip};

use crate::runner::BacktestResult;
use crate::sweep::SweepResults;

/// Summary statistics over a run's round trips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeStats {
    pub closed: usize,
    pub open: usize,
    pub winners: usize,
    pub win_rate: f64,
    pub avg_return: f64,
    pub best_return: f64,
    pub worst_return: f64,
}

impl TradeStats {
    pub fn from_trades(trades: &[RoundTrip]) -> Self {
        let closed: Vec<&RoundTrip> = trades.iter().filter(|t| !t.is_open()).collect();
        let winners = closed.iter().filter(|t| t.is_winner()).count();
        let returns: Vec<f64> = closed.iter().map(|t| t.return_pct()).collect();
        let n = closed.len();

        Self {
            closed: n,
            open: trades.len() - n,
            winners,
            win_rate: if n > 0 { winners as f64 / n as f64 } else { 0.0 },
            avg_return: if n > 0 {
                returns.iter().sum::<f64>() / n as f64
            } else {
                0.0
            },
            best_return: returns.iter().copied().fold(0.0, f64::max),
            worst_return: returns.iter().copied().fold(0.0, f64::min),
        }
    }
}

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn ratio(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.3}")
    } else if v > 0.0 {
        "∞".to_string()
    } else {
        format!("{v}")
    }
}

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let cfg = &result.config;

    md.push_str("# Backtest Report\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        md.push_str(&format!("| Period | {start} to {end} |\n"));
    }
    md.push_str(&format!(
        "| Bars | {} × {}-day ({} daily, {} warmup dropped) |\n",
        result.bars.len(),
        cfg.data.time_frame_days,
        result.daily_bar_count,
        result.warmup_bars
    ));
    md.push_str(&format!("| Run ID | `{}` |\n", result.short_id()));
    md.push_str(&format!("| Dataset Hash | `{}` |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    // Parameters
    md.push_str("## Parameters\n\n");
    md.push_str(&format!(
        "- **Signal**: RSI({}) crossing {}\n",
        cfg.strategy.rsi_period, cfg.strategy.rsi_threshold
    ));
    md.push_str(&format!(
        "- **Initial Capital**: ${:.0}\n",
        cfg.backtest.initial_capital
    ));
    match cfg.backtest.breakeven_trigger_pct {
        Some(t) => md.push_str(&format!("- **Breakeven Stop**: after {} gain\n", pct(t))),
        None => md.push_str("- **Breakeven Stop**: disabled\n"),
    }
    if cfg.backtest.partial_exit_rules.is_empty() {
        md.push_str("- **Take-Profit Ladder**: none\n");
    } else {
        md.push_str("- **Take-Profit Ladder**:\n");
        for rule in &cfg.backtest.partial_exit_rules {
            md.push_str(&format!(
                "  - sell {} of initial size at +{}\n",
                pct(rule.size_pct),
                pct(rule.gain_pct)
            ));
        }
    }
    md.push('\n');

    // Performance Summary
    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Value | ${:.2} |\n", result.final_value()));
    md.push_str(&format!("| Total Return | {} |\n", pct(m.total_return)));
    md.push_str(&format!("| Buy & Hold Return | {} |\n", pct(m.buy_and_hold_return)));
    md.push_str(&format!("| CAGR | {} |\n", pct(m.cagr)));
    md.push_str(&format!("| Sharpe | {} |\n", ratio(m.sharpe)));
    md.push_str(&format!("| Calmar | {} |\n", ratio(m.calmar)));
    md.push_str(&format!("| Max Drawdown | {} |\n", pct(m.max_drawdown)));
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push('\n');

    // Round trips
    let stats = TradeStats::from_trades(&result.trades);
    md.push_str("## Round Trips\n\n");
    md.push_str("| Statistic | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Closed | {} |\n", stats.closed));
    md.push_str(&format!("| Open at End | {} |\n", stats.open));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", stats.win_rate * 100.0));
    md.push_str(&format!("| Avg Return | {} |\n", pct(stats.avg_return)));
    md.push_str(&format!("| Best | {} |\n", pct(stats.best_return)));
    md.push_str(&format!("| Worst | {} |\n", pct(stats.worst_return)));
    md.push('\n');

    // Exit breakdown
    let exits = exit_breakdown(result);
    if !exits.is_empty() {
        md.push_str("## Exits by Rule\n\n");
        md.push_str("| Rule | Fills | Proceeds |\n");
        md.push_str("| --- | ---: | ---: |\n");
        for (label, (count, proceeds)) in &exits {
            md.push_str(&format!("| {label} | {count} | ${proceeds:.2} |\n"));
        }
        md.push('\n');
    }

    md
}

/// Exit fills grouped by label: count and total cash received.
fn exit_breakdown(result: &BacktestResult) -> BTreeMap<String, (usize, f64)> {
    let mut out: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for fill in result.fills.iter().filter(|f| f.kind != FillKind::Entry) {
        let entry = out.entry(fill.kind.label()).or_default();
        entry.0 += 1;
        entry.1 += fill.cash_delta;
    }
    out
}

/// Markdown leaderboard for a sweep, ranked by Calmar then Sharpe.
pub fn generate_sweep_report(results: &SweepResults) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Sweep Leaderboard\n\n");
    md.push_str("| Rank | Breakeven | Ladder | Total Return | CAGR | Sharpe | Calmar | Max DD | Trades |\n");
    md.push_str("| ---: | --- | --- | ---: | ---: | ---: | ---: | ---: | ---: |\n");
    for (rank, outcome) in results.ranked().iter().enumerate() {
        let m = &outcome.result.metrics;
        let breakeven = outcome
            .point
            .breakeven_trigger_pct
            .map_or_else(|| "off".to_string(), pct);
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            rank + 1,
            breakeven,
            outcome.point.ladder_name,
            pct(m.total_return),
            pct(m.cagr),
            ratio(m.sharpe),
            ratio(m.calmar),
            pct(m.max_drawdown),
            m.trade_count
        ));
    }
    md
}
