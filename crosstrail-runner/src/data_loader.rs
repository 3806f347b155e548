//! Bar loading for the runner.
//!
//! Bars come from a CSV file with a header row naming `date` (or
//! `timestamp`/`datetime`), `open`, `high`, `low`, `close` and optionally
//! `volume`. Header matching is case-insensitive and extra columns such as
//! `Adj Close` are ignored. Timestamps may be date-only (`2024-01-02`) or
//! date-time (`2024-01-02 15:30:00`, `2024-01-02T15:30:00`).
//!
//! Synthetic data is a developer-only debug mode. Results produced on
//! synthetic data are tagged as such in the run result.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use crosstrail_core::domain::Bar;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse {column} value '{value}'")]
    BadValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("no bars in feed")]
    Empty,

    #[error("row {row}: timestamp {current} does not follow {previous}")]
    NotIncreasing {
        row: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    /// BLAKE3 over all bar data, for fingerprinting results.
    pub dataset_hash: String,
    pub synthetic: bool,
}

impl LoadedBars {
    fn new(bars: Vec<Bar>, synthetic: bool) -> Self {
        let dataset_hash = compute_dataset_hash(&bars);
        Self {
            bars,
            dataset_hash,
            synthetic,
        }
    }
}

/// Load bars from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<LoadedBars, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(file)?;
    tracing::info!("loaded {} bars from {}", bars.len(), path.display());
    Ok(LoadedBars::new(bars, false))
}

/// Deterministic synthetic bars, tagged as synthetic.
pub fn load_synthetic(n: usize, seed: u64) -> LoadedBars {
    tracing::warn!("using {n} synthetic bars (seed {seed}); results are not real market data");
    LoadedBars::new(synthetic_bars(n, seed), true)
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        Ok(Self {
            timestamp: find(&["date", "timestamp", "datetime"])
                .ok_or(LoadError::MissingColumn("date"))?,
            open: find(&["open"]).ok_or(LoadError::MissingColumn("open"))?,
            high: find(&["high"]).ok_or(LoadError::MissingColumn("high"))?,
            low: find(&["low"]).ok_or(LoadError::MissingColumn("low"))?,
            close: find(&["close"]).ok_or(LoadError::MissingColumn("close"))?,
            volume: find(&["volume"]),
        })
    }
}

/// Parse bars from any CSV reader. Rows must be in strictly increasing
/// timestamp order.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let cols = Columns::from_headers(rdr.headers()?)?;

    let mut bars: Vec<Bar> = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is row 1.
        let row = i + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let number = |idx: usize, column: &'static str| {
            let raw = field(idx);
            raw.parse::<f64>().map_err(|_| LoadError::BadValue {
                row,
                column,
                value: raw.to_string(),
            })
        };

        let raw_ts = field(cols.timestamp);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadValue {
            row,
            column: "date",
            value: raw_ts.to_string(),
        })?;
        if let Some(prev) = bars.last() {
            if timestamp <= prev.timestamp {
                return Err(LoadError::NotIncreasing {
                    row,
                    previous: prev.timestamp,
                    current: timestamp,
                });
            }
        }

        let volume = match cols.volume {
            Some(idx) if !field(idx).is_empty() => number(idx, "volume")?,
            _ => 0.0,
        };
        bars.push(Bar {
            timestamp,
            open: number(cols.open, "open")?,
            high: number(cols.high, "high")?,
            low: number(cols.low, "low")?,
            close: number(cols.close, "close")?,
            volume,
        });
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(bars)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Generate synthetic daily bars for testing/development.
///
/// The series falls for the first quarter, rises through the middle half and
/// falls again in the last quarter, with seeded noise on top, so a crossover
/// strategy sees at least one golden and one death cross given enough bars.
/// Weekends are skipped.
pub fn synthetic_bars(n: usize, seed: u64) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(n);
    let mut price = 1800.0_f64;
    let Some(mut day) = NaiveDate::from_ymd_opt(2023, 1, 2) else {
        return bars;
    };

    let turn_up = n / 4;
    let turn_down = n - n / 4;
    while bars.len() < n {
        if matches!(day.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            day += chrono::Duration::days(1);
            continue;
        }
        let i = bars.len();
        let drift = if i < turn_up || i >= turn_down {
            -0.002
        } else {
            0.003
        };
        let daily_return = drift + rng.gen_range(-0.008..0.008);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        let volume = rng.gen_range(50_000.0..250_000.0);

        if let Some(timestamp) = day.and_hms_opt(0, 0, 0) {
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        price = close;
        day += chrono::Duration::days(1);
    }
    bars
}

/// Deterministic hash of a bar series.
fn compute_dataset_hash(bars: &[Bar]) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    const YAHOO_STYLE: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-02,2064.4,2074.9,2053.1,2064.4,2064.4,1503
2024-01-03,2061.0,2061.0,2033.1,2034.2,2034.2,1220
2024-01-04,2037.3,2050.0,2036.1,2042.3,2042.3,
";

    #[test]
    fn parses_yahoo_style_csv() {
        let bars = read_bars(YAHOO_STYLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].close, 2064.4);
        assert_eq!(bars[0].volume, 1503.0);
        assert_eq!(bars[2].volume, 0.0);
        assert_eq!(
            bars[1].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 3)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn parses_intraday_timestamps() {
        let csv = "timestamp,open,high,low,close\n\
                   2024-01-02 09:30:00,1,2,0.5,1.5\n\
                   2024-01-02T09:31:00,1.5,2,1,1.8\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[1].timestamp > bars[0].timestamp);
    }

    #[test]
    fn rejects_empty_feed() {
        let err = read_bars("date,open,high,low,close\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn rejects_missing_column() {
        let err = read_bars("date,open,high,low\n2024-01-02,1,2,0,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("close")));
    }

    #[test]
    fn rejects_non_increasing_timestamps() {
        let csv = "date,open,high,low,close\n\
                   2024-01-03,1,2,0.5,1.5\n\
                   2024-01-02,1,2,0.5,1.5\n";
        let err = read_bars(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::NotIncreasing { row: 3, .. }));
    }

    #[test]
    fn rejects_unparseable_price() {
        let csv = "date,open,high,low,close\n2024-01-02,1,2,0.5,abc\n";
        let err = read_bars(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::BadValue {
                column: "close",
                ..
            }
        ));
    }

    #[test]
    fn synthetic_is_deterministic_and_weekday_only() {
        let a = synthetic_bars(300, 7);
        let b = synthetic_bars(300, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 300);
        assert_ne!(a, synthetic_bars(300, 8));
        for bar in &a {
            assert!(bar.is_sane(), "insane synthetic bar: {bar:?}");
            let wd = bar.timestamp.date().weekday();
            assert!(wd != chrono::Weekday::Sat && wd != chrono::Weekday::Sun);
        }
        for w in a.windows(2) {
            assert!(w[1].timestamp > w[0].timestamp);
        }
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let a = LoadedBars::new(synthetic_bars(50, 1), true);
        let b = LoadedBars::new(synthetic_bars(50, 1), true);
        let c = LoadedBars::new(synthetic_bars(50, 2), true);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_ne!(a.dataset_hash, c.dataset_hash);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gold.csv");
        std::fs::write(&path, YAHOO_STYLE).unwrap();
        let loaded = load_bars_csv(&path).unwrap();
        assert_eq!(loaded.bars.len(), 3);
        assert!(!loaded.synthetic);

        let missing = load_bars_csv(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(missing, LoadError::Io { .. }));
    }
}
