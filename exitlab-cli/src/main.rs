//! ExitLab CLI: run single backtests and exit-rule sweeps.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config (or the built-in defaults)
//! - `sweep`: run the config's `[sweep]` grid and print a leaderboard

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exitlab_runner::data_loader::load_bars;
use exitlab_runner::report::TradeStats;
use exitlab_runner::runner::run_single_backtest;
use exitlab_runner::sweep::{ParamSweep, SweepGrid, SweepResults};
use exitlab_runner::{save_artifacts, BacktestConfig, BacktestResult, LoadOptions};

#[derive(Parser)]
#[command(name = "exitlab", about = "ExitLab: layered-exit backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest.
    Run {
        /// Path to a TOML config file. Defaults to the built-in configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Daily bar CSV (overrides `data.path`).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Symbol label (overrides `data.symbol`).
        #[arg(long)]
        symbol: Option<String>,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Use a seeded synthetic random walk instead of a CSV.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for synthetic data. Defaults to a hash of the symbol.
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip writing artifacts.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,

        /// Print metrics as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run every point of the config's `[sweep]` grid.
    Sweep {
        /// Path to a TOML config file with a `[sweep]` section.
        #[arg(long)]
        config: PathBuf,

        /// Use a seeded synthetic random walk instead of a CSV.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for synthetic data.
        #[arg(long)]
        seed: Option<u64>,

        /// Run grid points one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        serial: bool,

        /// Write the leaderboard as Markdown to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            symbol,
            start,
            end,
            synthetic,
            seed,
            output_dir,
            no_artifacts,
            json,
        } => {
            if data.is_some() && synthetic {
                bail!("--data and --synthetic are mutually exclusive");
            }
            let mut backtest_config = match config {
                Some(path) => BacktestConfig::from_file(&path)?,
                None => BacktestConfig::default(),
            };
            if let Some(path) = data {
                backtest_config.data.path = Some(path);
            }
            if let Some(symbol) = symbol {
                backtest_config.data.symbol = symbol;
            }
            if let Some(start) = start.as_deref() {
                backtest_config.data.start_date = Some(parse_date(start)?);
            }
            if let Some(end) = end.as_deref() {
                backtest_config.data.end_date = Some(parse_date(end)?);
            }
            let opts = load_options(synthetic, seed)?;
            run_backtest_cmd(&backtest_config, &opts, &output_dir, no_artifacts, json)
        }
        Commands::Sweep {
            config,
            synthetic,
            seed,
            serial,
            report,
        } => {
            let opts = load_options(synthetic, seed)?;
            let backtest_config = BacktestConfig::from_file(&config)?;
            run_sweep_cmd(&backtest_config, &opts, !serial, report)
        }
    }
}

fn load_options(synthetic: bool, seed: Option<u64>) -> Result<LoadOptions> {
    if seed.is_some() && !synthetic {
        bail!("--seed requires --synthetic");
    }
    Ok(LoadOptions { synthetic, seed })
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_backtest_cmd(
    config: &BacktestConfig,
    opts: &LoadOptions,
    output_dir: &std::path::Path,
    no_artifacts: bool,
    json: bool,
) -> Result<()> {
    let result = run_single_backtest(config, opts)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.metrics)?);
    } else {
        print_summary(&result);
    }

    if !no_artifacts {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

fn run_sweep_cmd(
    config: &BacktestConfig,
    opts: &LoadOptions,
    parallel: bool,
    report: Option<PathBuf>,
) -> Result<()> {
    let Some(sweep) = config.sweep.as_ref() else {
        bail!("config has no [sweep] section");
    };
    let grid = SweepGrid::from_config(sweep, config)?;
    let loaded = load_bars(&config.data, opts)?;

    let results = ParamSweep::new()
        .with_parallelism(parallel)
        .run(&grid, config, &loaded)?;

    print_leaderboard(&results);

    if let Some(path) = report {
        let md = exitlab_runner::generate_sweep_report(&results);
        std::fs::write(&path, md)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Leaderboard saved to: {}", path.display());
    }

    Ok(())
}

fn ratio(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.3}")
    } else {
        format!("{v}")
    }
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    let stats = TradeStats::from_trades(&result.trades);
    let cfg = &result.config;

    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("Period:         {start} to {end}");
    }
    println!(
        "Bars:           {} x {}-day ({} warmup dropped)",
        result.bars.len(),
        cfg.data.time_frame_days,
        result.warmup_bars
    );
    println!("Run ID:         {}", result.short_id());
    println!();
    println!("--- Performance ---");
    println!("Initial:        ${:.2}", cfg.backtest.initial_capital);
    println!("Final:          ${:.2}", result.final_value());
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Buy & Hold:     {:.2}%", m.buy_and_hold_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {}", ratio(m.sharpe));
    println!("Calmar:         {}", ratio(m.calmar));
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Trades:         {}", m.trade_count);
    println!(
        "Win Rate:       {:.1}% ({} closed, {} open)",
        stats.win_rate * 100.0,
        stats.closed,
        stats.open
    );
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_leaderboard(results: &SweepResults) {
    println!();
    println!(
        "{:>4}  {:<10} {:<14} {:>10} {:>9} {:>8} {:>8} {:>9} {:>6}",
        "Rank", "Breakeven", "Ladder", "Return", "CAGR", "Sharpe", "Calmar", "MaxDD", "Trades"
    );
    println!("{}", "-".repeat(88));
    for (rank, outcome) in results.ranked().iter().enumerate() {
        let m = &outcome.result.metrics;
        let breakeven = outcome
            .point
            .breakeven_trigger_pct
            .map_or_else(|| "off".to_string(), |t| format!("{:.1}%", t * 100.0));
        println!(
            "{:>4}  {:<10} {:<14} {:>9.2}% {:>8.2}% {:>8} {:>8} {:>8.2}% {:>6}",
            rank + 1,
            breakeven,
            outcome.point.ladder_name,
            m.total_return * 100.0,
            m.cagr * 100.0,
            ratio(m.sharpe),
            ratio(m.calmar),
            m.max_drawdown * 100.0,
            m.trade_count
        );
    }
    println!();
}
