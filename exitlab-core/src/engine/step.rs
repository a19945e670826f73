//! Single-bar transition of the simulation fold.
//!
//! Rule order for each bar after the baseline:
//! 1. With an open position: stop-loss, breakeven ratchet, partial
//!    take-profits (highest rung first), then the Sell signal.
//! 2. When flat (including a position closed earlier on this bar): Buy signal
//!    deploys all cash at the close.
//! 3. Mark-to-market at the close.

use tracing::debug;

use crate::domain::{Bar, Fill, FillKind, PortfolioState, Position, PositionState, Signal};

use super::state::{BarOutcome, EngineState, SimulationConfig};

/// Share residual treated as zero after a take-profit sale.
pub const DUST_SHARES: f64 = 1e-9;

/// Running tallies for the bar being processed.
struct BarLedger {
    bar_index: usize,
    fills: Vec<Fill>,
    entries: u32,
    exits: u32,
}

impl BarLedger {
    fn exit(&mut self, bar: &Bar, kind: FillKind, price: f64, shares: f64) -> f64 {
        let proceeds = price * shares;
        self.exits += 1;
        self.fills.push(Fill {
            bar_index: self.bar_index,
            date: bar.date,
            kind,
            price,
            shares,
            cash_delta: proceeds,
        });
        proceeds
    }
}

/// Advance the simulation by one bar.
///
/// Pure with respect to its inputs: `prev` is not modified and the same
/// arguments always produce the same outcome.
pub fn step(
    prev: &EngineState,
    bar: &Bar,
    bar_index: usize,
    config: &SimulationConfig,
) -> BarOutcome {
    let mut cash = prev.cash;
    let mut ledger = BarLedger {
        bar_index,
        fills: Vec::new(),
        entries: 0,
        exits: 0,
    };

    let position = match &prev.position {
        PositionState::Open(pos) => {
            manage_open_position(pos.clone(), bar, config, &mut cash, &mut ledger)
        }
        PositionState::Flat => PositionState::Flat,
    };

    let position = match position {
        PositionState::Flat if bar.signal == Signal::Buy && cash > 0.0 => {
            let pos = Position::open(bar_index, bar.date, cash, bar.close);
            debug!(
                date = %bar.date,
                price = bar.close,
                shares = pos.shares,
                "entry"
            );
            ledger.entries += 1;
            ledger.fills.push(Fill {
                bar_index,
                date: bar.date,
                kind: FillKind::Entry,
                price: bar.close,
                shares: pos.shares,
                cash_delta: -cash,
            });
            cash = 0.0;
            PositionState::Open(pos)
        }
        other => other,
    };

    let portfolio = PortfolioState::mark(
        bar.date,
        cash,
        position.shares(),
        bar.close,
        ledger.entries,
        ledger.exits,
    );

    BarOutcome {
        state: EngineState { cash, position },
        portfolio,
        fills: ledger.fills,
    }
}

/// Apply the exit rules to an open position. Returns the position's state
/// after this bar's exits.
fn manage_open_position(
    mut pos: Position,
    bar: &Bar,
    config: &SimulationConfig,
    cash: &mut f64,
    ledger: &mut BarLedger,
) -> PositionState {
    if let Some(stop_price) = pos.stop.triggered_by(bar.low) {
        debug!(
            date = %bar.date,
            price = stop_price,
            shares = pos.shares,
            "stop loss hit"
        );
        *cash += ledger.exit(bar, FillKind::StopLoss, stop_price, pos.shares);
        return PositionState::Flat;
    }

    let gain = pos.gain_at(bar.high);

    if config.breakeven_reached(gain) && pos.stop.is_below(pos.entry_price) {
        pos.stop.raise(pos.entry_price);
        debug!(
            date = %bar.date,
            stop = pos.entry_price,
            gain,
            "breakeven stop armed"
        );
    }

    for (id, rule) in config.ladder.iter() {
        if gain < rule.gain_pct || pos.has_fired(id) {
            continue;
        }
        pos.fired.insert(id);

        let mut to_sell = pos.shares.min(pos.initial_value * rule.size_pct / pos.entry_price);
        if to_sell <= 0.0 {
            continue;
        }
        if pos.shares - to_sell < DUST_SHARES {
            to_sell = pos.shares;
        }

        let price = rule.target_price(pos.entry_price);
        debug!(
            date = %bar.date,
            gain_pct = rule.gain_pct,
            price,
            shares = to_sell,
            "take profit"
        );
        *cash += ledger.exit(
            bar,
            FillKind::TakeProfit {
                rule: id,
                gain_pct: rule.gain_pct,
            },
            price,
            to_sell,
        );
        pos.shares -= to_sell;

        if pos.shares <= 0.0 {
            return PositionState::Flat;
        }
    }

    if bar.signal == Signal::Sell {
        debug!(
            date = %bar.date,
            price = bar.close,
            shares = pos.shares,
            "signal exit"
        );
        *cash += ledger.exit(bar, FillKind::SignalExit, bar.close, pos.shares);
        return PositionState::Flat;
    }

    PositionState::Open(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position_management::{PartialExitRule, RuleId};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn open_state(cash: f64, entry_price: f64, shares_cash: f64) -> EngineState {
        EngineState {
            cash,
            position: PositionState::Open(Position::open(0, d(1), shares_cash, entry_price)),
        }
    }

    #[test]
    fn flat_hold_bar_changes_nothing() {
        let cfg = SimulationConfig::signal_only(1_000.0).unwrap();
        let prev = EngineState::new(1_000.0);
        let bar = Bar::new(d(2), 10.0, 11.0, 9.0, 10.5, 100.0);
        let out = step(&prev, &bar, 1, &cfg);
        assert_eq!(out.state, prev);
        assert!(out.fills.is_empty());
        assert_eq!(out.portfolio.total_value, 1_000.0);
    }

    #[test]
    fn buy_deploys_all_cash_at_close() {
        let cfg = SimulationConfig::signal_only(1_000.0).unwrap();
        let prev = EngineState::new(1_000.0);
        let bar = Bar::new(d(2), 10.0, 11.0, 9.0, 8.0, 100.0).with_signal(Signal::Buy);
        let out = step(&prev, &bar, 1, &cfg);
        assert_eq!(out.state.cash, 0.0);
        assert!((out.state.position.shares() - 125.0).abs() < 1e-10);
        assert_eq!(out.portfolio.entries, 1);
        assert_eq!(out.fills.len(), 1);
        assert_eq!(out.fills[0].cash_delta, -1_000.0);
    }

    #[test]
    fn stop_loss_skips_remaining_rules() {
        let rules = [PartialExitRule::new(0.3, 0.3)];
        let cfg = SimulationConfig::new(1_000.0, Some(0.1), &rules).unwrap();
        let mut prev = open_state(0.0, 100.0, 1_000.0);
        if let PositionState::Open(pos) = &mut prev.position {
            pos.stop.raise(100.0);
        }
        // Low touches the stop, high would satisfy the rung.
        let bar = Bar::new(d(2), 120.0, 140.0, 95.0, 130.0, 1.0).with_signal(Signal::Sell);
        let out = step(&prev, &bar, 1, &cfg);
        assert_eq!(out.fills.len(), 1);
        assert_eq!(out.fills[0].kind, FillKind::StopLoss);
        assert_eq!(out.fills[0].price, 100.0);
        assert!((out.state.cash - 1_000.0).abs() < 1e-9);
        assert_eq!(out.portfolio.exits, 1);
    }

    #[test]
    fn breakeven_arms_stop_at_entry() {
        let cfg = SimulationConfig::new(1_000.0, Some(0.1), &[]).unwrap();
        let prev = open_state(0.0, 100.0, 1_000.0);
        let bar = Bar::new(d(2), 105.0, 112.0, 104.0, 108.0, 1.0);
        let out = step(&prev, &bar, 1, &cfg);
        let pos = out.state.position.as_open().unwrap();
        assert_eq!(pos.stop_loss_price(), Some(100.0));
        assert!(out.fills.is_empty());
    }

    #[test]
    fn rung_fires_once_per_position() {
        let rules = [PartialExitRule::new(0.3, 0.3)];
        let cfg = SimulationConfig::new(1_000.0, None, &rules).unwrap();
        let prev = open_state(0.0, 100.0, 1_000.0);
        let bar = Bar::new(d(2), 120.0, 135.0, 118.0, 130.0, 1.0);

        let first = step(&prev, &bar, 1, &cfg);
        assert_eq!(first.fills.len(), 1);
        assert_eq!(first.fills[0].price, 130.0);
        assert!((first.fills[0].shares - 3.0).abs() < 1e-10);
        assert!(first
            .state
            .position
            .as_open()
            .unwrap()
            .has_fired(RuleId(0)));

        let second = step(&first.state, &bar, 2, &cfg);
        assert!(second.fills.is_empty());
    }

    #[test]
    fn oversubscribed_ladder_clamps_and_closes() {
        let rules = [PartialExitRule::new(0.2, 0.8), PartialExitRule::new(0.1, 0.8)];
        let cfg = SimulationConfig::new(1_000.0, None, &rules).unwrap();
        let prev = open_state(0.0, 100.0, 1_000.0);
        let bar = Bar::new(d(2), 110.0, 125.0, 105.0, 120.0, 1.0);
        let out = step(&prev, &bar, 1, &cfg);

        assert_eq!(out.fills.len(), 2);
        assert!((out.fills[0].shares - 8.0).abs() < 1e-10);
        assert!((out.fills[1].shares - 2.0).abs() < 1e-10);
        assert!(!out.state.position.is_open());
        assert!((out.state.cash - (8.0 * 120.0 + 2.0 * 110.0)).abs() < 1e-9);
    }

    #[test]
    fn stop_then_buy_reenters_same_bar() {
        let cfg = SimulationConfig::new(1_000.0, Some(0.1), &[]).unwrap();
        let mut prev = open_state(0.0, 100.0, 1_000.0);
        if let PositionState::Open(pos) = &mut prev.position {
            pos.stop.raise(100.0);
        }
        let bar = Bar::new(d(2), 101.0, 102.0, 90.0, 95.0, 1.0).with_signal(Signal::Buy);
        let out = step(&prev, &bar, 1, &cfg);
        assert_eq!(out.portfolio.exits, 1);
        assert_eq!(out.portfolio.entries, 1);
        assert_eq!(out.portfolio.trade_delta(), 0);
        let pos = out.state.position.as_open().unwrap();
        assert_eq!(pos.entry_price, 95.0);
        assert_eq!(pos.stop_loss_price(), None);
    }
}
