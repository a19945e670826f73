//! Artifact export: JSON manifest, CSV tables and the Markdown report.
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use exitlab_core::domain::{Fill, RoundTrip};

use crate::report::generate_report;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Bar-by-bar portfolio table.
///
/// Columns: date, close, signal, indicator, cash, holdings, total, shares,
/// drawdown, buy_hold_equity
pub fn export_portfolio_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "close",
        "signal",
        "indicator",
        "cash",
        "holdings",
        "total",
        "shares",
        "drawdown",
        "buy_hold_equity",
    ])?;

    for (i, (bar, state)) in result.bars.iter().zip(&result.states).enumerate() {
        let indicator = result.indicator.get(i).copied().unwrap_or(f64::NAN);
        let drawdown = result.drawdown.get(i).copied().unwrap_or(0.0);
        let buy_hold = result.buy_and_hold_equity.get(i).copied().unwrap_or(0.0);
        wtr.write_record([
            &state.date.to_string(),
            &format!("{:.4}", bar.close),
            &bar.signal.as_i8().to_string(),
            &format!("{:.4}", indicator),
            &format!("{:.2}", state.cash),
            &format!("{:.2}", state.holdings_value),
            &format!("{:.2}", state.total_value),
            &format!("{:.6}", state.shares),
            &format!("{:.6}", drawdown),
            &format!("{:.2}", buy_hold),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Fill log.
///
/// Columns: bar_index, date, kind, price, shares, cash_delta
pub fn export_fills_csv(fills: &[Fill]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "date", "kind", "price", "shares", "cash_delta"])?;
    for f in fills {
        wtr.write_record([
            &f.bar_index.to_string(),
            &f.date.to_string(),
            &f.kind.label(),
            &format!("{:.4}", f.price),
            &format!("{:.6}", f.shares),
            &format!("{:.2}", f.cash_delta),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Round trips, open positions included with empty exit columns.
///
/// Columns: entry_bar, entry_date, entry_price, shares, invested, exit_bar,
/// exit_date, exit_fills, proceeds, pnl, return_pct, closed_by, mae, mfe
pub fn export_trades_csv(trades: &[RoundTrip]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_bar",
        "entry_date",
        "entry_price",
        "shares",
        "invested",
        "exit_bar",
        "exit_date",
        "exit_fills",
        "proceeds",
        "pnl",
        "return_pct",
        "closed_by",
        "mae",
        "mfe",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_bar.to_string(),
            &t.entry_date.to_string(),
            &format!("{:.4}", t.entry_price),
            &format!("{:.6}", t.shares),
            &format!("{:.2}", t.invested),
            &t.exit_bar.map(|b| b.to_string()).unwrap_or_default(),
            &t.exit_date.map(|d| d.to_string()).unwrap_or_default(),
            &t.exit_fills.to_string(),
            &format!("{:.2}", t.proceeds),
            &format!("{:.2}", t.pnl()),
            &format!("{:.6}", t.return_pct()),
            &t.closed_by.clone().unwrap_or_default(),
            &format!("{:.6}", t.mae),
            &format!("{:.6}", t.mfe),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a run: `{symbol}_{run id prefix}`.
pub fn artifact_dir_name(result: &BacktestResult) -> String {
    format!("{}_{}", result.symbol, result.short_id())
}

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{run id prefix}/` under `output_dir` containing
/// `manifest.json`, `portfolio.csv`, `fills.csv`, `trades.csv` and
/// `report.md`. Re-running the same config overwrites the same directory.
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("manifest.json", export_json(result)?),
        ("portfolio.csv", export_portfolio_csv(result)?),
        ("fills.csv", export_fills_csv(&result.fills)?),
        ("trades.csv", export_trades_csv(&result.trades)?),
        ("report.md", generate_report(result)),
    ];
    for (name, contents) in &files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::data_loader::{load_bars, LoadOptions};
    use crate::runner::run_backtest_from_data;

    fn sample_result() -> BacktestResult {
        let mut config = BacktestConfig::default();
        config.data.symbol = "SYN".into();
        config.strategy.rsi_period = 14;
        let opts = LoadOptions {
            synthetic: true,
            seed: Some(42),
        };
        let loaded = load_bars(&config.data, &opts).unwrap();
        run_backtest_from_data(&config, &loaded).unwrap()
    }

    #[test]
    fn json_roundtrip() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, result.run_id);
        assert_eq!(back.config, result.config);
        assert_eq!(back.bars.len(), result.bars.len());
        assert_eq!(back.fills.len(), result.fills.len());
        assert_eq!(back.metrics.trade_count, result.metrics.trade_count);
        assert!((back.final_value() - result.final_value()).abs() < 1e-6);
    }

    #[test]
    fn json_rejects_newer_version() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&result).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn json_defaults_missing_version() {
        let result = sample_result();
        let mut value = serde_json::to_value(&result).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        let back = import_json(&value.to_string()).unwrap();
        assert_eq!(back.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn portfolio_csv_has_one_row_per_bar() {
        let result = sample_result();
        let csv = export_portfolio_csv(&result).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,close,signal,indicator,cash,holdings,total,shares,drawdown,buy_hold_equity"
        );
        assert_eq!(lines.count(), result.bars.len());
    }

    #[test]
    fn fills_csv_uses_labels() {
        let result = sample_result();
        assert!(!result.fills.is_empty());
        let csv = export_fills_csv(&result.fills).unwrap();
        assert_eq!(csv.lines().count(), result.fills.len() + 1);
        assert!(csv.contains(",entry,"));
    }

    #[test]
    fn trades_csv_empty() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("entry_bar,entry_date"));
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let result = sample_result();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();

        assert_eq!(run_dir.file_name().unwrap(), artifact_dir_name(&result).as_str());
        for name in ["manifest.json", "portfolio.csv", "fills.csv", "trades.csv", "report.md"] {
            assert!(run_dir.join(name).exists(), "missing {name}");
        }

        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.symbol, result.symbol);
        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
        assert!((loaded.metrics.total_return - result.metrics.total_return).abs() < 1e-10);
    }
}
