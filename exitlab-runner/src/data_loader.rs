//! Bar loading for the runner.
//!
//! Daily bars come from one of two places:
//! 1. A CSV file named in the config (`date,open,high,low,close,volume`,
//!    Yahoo-style capitalized headers accepted, extra columns ignored)
//! 2. A seeded synthetic random walk, when explicitly requested
//!
//! Synthetic data is a developer-only debug mode; results produced on it are
//! tagged so they are never mistaken for real market behavior.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use exitlab_core::domain::Bar;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DataConfig;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data path configured for '{symbol}' (use --synthetic for synthetic data)")]
    NoSource { symbol: String },

    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("duplicate bar for {date}")]
    DuplicateDate { date: NaiveDate },

    #[error("no bars for '{symbol}' in the requested date range")]
    Empty { symbol: String },
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Generate synthetic bars instead of reading the configured CSV.
    pub synthetic: bool,
    /// Seed for synthetic bars; `None` derives one from the symbol.
    pub seed: Option<u64>,
}

/// Where a run's bars came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic { seed: u64 },
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    /// Daily bars, ascending, filtered to the configured range.
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// Dataset hash for fingerprinting (BLAKE3 over all bar data).
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// One CSV row.
#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
}

impl From<DailyBar> for Bar {
    fn from(row: DailyBar) -> Self {
        Bar::new(row.date, row.open, row.high, row.low, row.close, row.volume)
    }
}

/// Default synthetic range when the config leaves dates open: six years.
const SYNTHETIC_DEFAULT_START: (i32, u32, u32) = (2019, 1, 2);
const SYNTHETIC_DEFAULT_DAYS: i64 = 6 * 365;

/// Load daily bars for `config.symbol`.
///
/// This is the primary entry point for the runner to get bar data.
pub fn load_bars(config: &DataConfig, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let symbol = config.symbol.clone();

    let (bars, source) = if opts.synthetic {
        let seed = opts.seed.unwrap_or_else(|| seed_from_symbol(&symbol));
        let (start, end) = synthetic_range(config.start_date, config.end_date);
        warn!(%symbol, seed, "generating synthetic data; results will be tagged as synthetic");
        (generate_synthetic_bars(start, end, seed), DataSource::Synthetic { seed })
    } else {
        let path = config
            .path
            .clone()
            .ok_or_else(|| LoadError::NoSource {
                symbol: symbol.clone(),
            })?;
        let bars = read_csv_file(&path)?;
        (filter_range(bars, config.start_date, config.end_date), DataSource::Csv { path })
    };

    if bars.is_empty() {
        return Err(LoadError::Empty { symbol });
    }

    let dataset_hash = compute_dataset_hash(&symbol, &bars);
    info!(
        %symbol,
        bars = bars.len(),
        first = %bars[0].date,
        last = %bars[bars.len() - 1].date,
        "loaded daily bars"
    );

    Ok(LoadedData {
        symbol,
        has_synthetic: matches!(source, DataSource::Synthetic { .. }),
        bars,
        source,
        dataset_hash,
    })
}

pub fn read_csv_file(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file)
}

/// Parse daily bars from CSV. Rows are sorted by date; duplicates are rejected.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = rdr
        .deserialize::<DailyBar>()
        .map(|row| row.map(Bar::from))
        .collect::<Result<Vec<_>, _>>()?;

    bars.sort_by_key(|b| b.date);
    if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(LoadError::DuplicateDate { date: pair[0].date });
    }

    let suspicious = bars.iter().filter(|b| !b.is_sane()).count();
    if suspicious > 0 {
        warn!(suspicious, "bars with high/low outside the open/close range");
    }
    Ok(bars)
}

fn filter_range(bars: Vec<Bar>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| start.map_or(true, |s| b.date >= s) && end.map_or(true, |e| b.date <= e))
        .collect()
}

fn synthetic_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    let (y, m, d) = SYNTHETIC_DEFAULT_START;
    let default_start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    match (start, end) {
        (Some(s), Some(e)) => (s, e),
        (Some(s), None) => (s, s + chrono::Duration::days(SYNTHETIC_DEFAULT_DAYS)),
        (None, Some(e)) => (e - chrono::Duration::days(SYNTHETIC_DEFAULT_DAYS), e),
        (None, None) => (
            default_start,
            default_start + chrono::Duration::days(SYNTHETIC_DEFAULT_DAYS),
        ),
    }
}

fn seed_from_symbol(symbol: &str) -> u64 {
    let hash = blake3::hash(symbol.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn compute_dataset_hash(symbol: &str, bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic weekday bars for testing/development.
///
/// A geometric random walk from 100.0 with enough drift and volatility to
/// trigger entries, take-profits and stops over a few years of data.
pub fn generate_synthetic_bars(start: NaiveDate, end: NaiveDate, seed: u64) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.04..0.042);
        let open = price * (1.0 + rng.gen_range(-0.005..0.005));
        let close = (price * (1.0 + daily_return)).max(0.5);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.02));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.02));
        let volume = rng.gen_range(500_000.0..5_000_000.0_f64).round();

        bars.push(Bar::new(current, open, high, low, close, volume));

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
