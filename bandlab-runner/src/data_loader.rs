//! Bar loading for the runner.
//!
//! Reads a CSV of intraday OHLC bars (timestamp in the first column, then
//! `Open, High, Low, Close[, Volume]` in any order, header names
//! case-insensitive), sorts it by timestamp and drops duplicate timestamps.
//! Empty price cells become NaN and are treated as void bars downstream.
//!
//! Fallback policy:
//! 1. If the file exists → load it
//! 2. If it does not and `synthetic` is set → generate synthetic bars (tagged)
//! 3. Otherwise → fail with `LoadError::NotFound`
//!
//! Synthetic data is a developer-only debug mode.

use std::path::{Path, PathBuf};

use bandlab_core::domain::Bar;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data file not found: {0} (use --synthetic for synthetic data)")]
    NotFound(PathBuf),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Keep only the first `max_rows` data rows of the file.
    pub max_rows: Option<usize>,
    /// Generate synthetic bars when the file does not exist.
    pub synthetic: bool,
}

/// Where the bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv,
    Synthetic,
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Bars sorted ascending by timestamp, unique timestamps.
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// Dataset hash for fingerprinting (BLAKE3 over all bar data).
    pub dataset_hash: String,
    /// Rows dropped because their timestamp was already present.
    pub duplicates_dropped: usize,
    /// Complete bars whose OHLC values contradict each other (e.g. high < low).
    /// They are kept; the count is reported as a data-quality warning.
    pub malformed_bars: usize,
}

impl LoadedData {
    pub fn has_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Load bars from `path`, falling back to synthetic data if allowed.
pub fn load_bars(path: &Path, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    if !path.exists() {
        if !opts.synthetic {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        log::warn!(
            "{} not found: generating synthetic data, results will be tagged as synthetic",
            path.display()
        );
        let seed = path.to_string_lossy();
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default();
        let bars = generate_synthetic_bars(&seed, start, 20);
        return Ok(LoadedData {
            dataset_hash: compute_dataset_hash(&bars),
            bars,
            source: DataSource::Synthetic,
            duplicates_dropped: 0,
            malformed_bars: 0,
        });
    }

    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let (bars, duplicates_dropped) = read_bars(reader, opts.max_rows)?;
    log::info!(
        "loaded {} bars from {} ({} duplicate timestamps dropped)",
        bars.len(),
        path.display(),
        duplicates_dropped
    );
    let malformed_bars = count_malformed(&bars);
    if malformed_bars > 0 {
        log::warn!("{malformed_bars} bars in {} fail the OHLC sanity check", path.display());
    }

    Ok(LoadedData {
        dataset_hash: compute_dataset_hash(&bars),
        bars,
        source: DataSource::Csv,
        duplicates_dropped,
        malformed_bars,
    })
}

/// Parse bars from any CSV reader. Returns the canonical bar list and the
/// number of duplicate timestamps dropped.
pub fn read_bars<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    max_rows: Option<usize>,
) -> Result<(Vec<Bar>, usize), LoadError> {
    let columns = Columns::from_headers(reader.headers()?)?;

    let mut bars = Vec::new();
    for (i, record) in reader.records().enumerate() {
        if max_rows.is_some_and(|max| i >= max) {
            break;
        }
        let record = record?;
        let line = record.position().map_or(i as u64 + 2, |p| p.line());
        bars.push(columns.parse(&record, line)?);
    }

    Ok(canonicalize(bars))
}

/// Non-void bars failing [`Bar::is_sane`].
pub fn count_malformed(bars: &[Bar]) -> usize {
    bars.iter().filter(|b| !b.is_void() && !b.is_sane()).count()
}

/// Sort by timestamp (stable) and keep the first bar per timestamp.
fn canonicalize(mut bars: Vec<Bar>) -> (Vec<Bar>, usize) {
    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    let dropped = before - bars.len();
    (bars, dropped)
}

/// Column positions resolved from the header row.
struct Columns {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .skip(1)
                .position(|h| h.eq_ignore_ascii_case(name))
                .map(|p| p + 1)
        };
        Ok(Self {
            open: find("open").ok_or(LoadError::MissingColumn("Open"))?,
            high: find("high").ok_or(LoadError::MissingColumn("High"))?,
            low: find("low").ok_or(LoadError::MissingColumn("Low"))?,
            close: find("close").ok_or(LoadError::MissingColumn("Close"))?,
            volume: find("volume"),
        })
    }

    fn parse(&self, record: &csv::StringRecord, line: u64) -> Result<Bar, LoadError> {
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let price = |idx: usize, name: &str| -> Result<f64, LoadError> {
            let raw = field(idx);
            if raw.is_empty() {
                return Ok(f64::NAN);
            }
            raw.parse::<f64>().map_err(|e| LoadError::Parse {
                line,
                message: format!("bad {name} '{raw}': {e}"),
            })
        };

        let timestamp = parse_timestamp(field(0)).ok_or_else(|| LoadError::Parse {
            line,
            message: format!("bad timestamp '{}'", field(0)),
        })?;

        Ok(Bar {
            timestamp,
            open: price(self.open, "Open")?,
            high: price(self.high, "High")?,
            low: price(self.low, "Low")?,
            close: price(self.close, "Close")?,
            volume: match self.volume {
                Some(idx) if !field(idx).is_empty() => price(idx, "Volume")?,
                _ => 0.0,
            },
        })
    }
}

/// Parse a bar timestamp. Offsets are dropped in favour of the local
/// wall-clock time, so sessions follow the exchange's calendar date.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%m/%d/%Y %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z")
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn compute_dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic one-minute bars for testing/development.
///
/// Produces a seeded random walk from 100.0 covering 07:00–16:59 on
/// `days` consecutive weekdays starting at `start`.
pub fn generate_synthetic_bars(seed: &str, start: NaiveDate, days: usize) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Deterministic seed from the requested source name
    let seed_bytes = blake3::hash(seed.as_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;
    let mut produced = 0;

    while produced < days {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += Duration::days(1);
            continue;
        }

        let Some(open_time) = current.and_hms_opt(7, 0, 0) else {
            break;
        };
        for minute in 0..600 {
            let step: f64 = rng.gen_range(-0.0015..0.0015);
            let open = price;
            let close = price * (1.0 + step);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0008));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0008));
            bars.push(Bar {
                timestamp: open_time + Duration::minutes(minute),
                open,
                high,
                low,
                close,
                volume: rng.gen_range(10..2_000) as f64,
            });
            price = close;
        }

        produced += 1;
        current += Duration::days(1);
    }

    bars
}
