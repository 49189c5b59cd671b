//! Per-ticker Parquet quote store.
//!
//! Layout: `{dir}/{sanitized ticker}.parquet`, one file per canonical ticker,
//! columns `date, open, high, low, close, adjusted_close, volume`.
//!
//! Writes are atomic: each write goes to its own temp file in the store
//! directory and is renamed into place. Two canonical tickers that sanitize
//! to the same name share a file; the last rename wins.

use super::provider::{QuoteBar, QuoteSeries};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("quote store I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("invalid quote file {path}: {message}")]
    Validation { path: PathBuf, message: String },
}

/// File stem for a canonical ticker: lower-cased, every character other than
/// letters, digits, `_` and `-` replaced by `_`. Non-ASCII letters are kept.
pub fn sanitize_ticker(ticker: &str) -> String {
    ticker
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub struct QuoteStore {
    dir: PathBuf,
}

impl QuoteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the store directory if missing.
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.clone(),
            message: e.to_string(),
        })
    }

    /// Path of the file holding `ticker`'s quotes.
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.parquet", sanitize_ticker(ticker)))
    }

    /// Persist a series, replacing any previous file for the ticker.
    /// Safe to call concurrently, including for tickers sharing a file.
    pub fn write(&self, ticker: &str, series: &QuoteSeries) -> Result<PathBuf, StoreError> {
        let path = self.path_for(ticker);
        let mut df = series_to_dataframe(series.bars())?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".quotes-")
            .suffix(".parquet.tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| StoreError::Io {
                path: self.dir.clone(),
                message: e.to_string(),
            })?;
        ParquetWriter::new(tmp.as_file_mut())
            .finish(&mut df)
            .map_err(|e| StoreError::Parquet(format!("write {}: {e}", tmp.path().display())))?;

        // Dropping the temp file on any error above removes it.
        tmp.persist(&path).map_err(|e| StoreError::Io {
            path: path.clone(),
            message: format!("atomic rename failed: {}", e.error),
        })?;
        Ok(path)
    }

    /// Load a persisted series; `Ok(None)` when the ticker was never saved.
    pub fn load(&self, ticker: &str) -> Result<Option<QuoteSeries>, StoreError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&path).map_err(|e| StoreError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| StoreError::Parquet(format!("read {}: {e}", path.display())))?;

        let bars = dataframe_to_bars(&df).map_err(|message| StoreError::Validation {
            path: path.clone(),
            message,
        })?;
        QuoteSeries::from_bars(bars)
            .map(Some)
            .ok_or_else(|| StoreError::Validation {
                path,
                message: "fewer than two rows".into(),
            })
    }
}

// ── Parquet conversion ──────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn series_to_dataframe(bars: &[QuoteBar]) -> Result<DataFrame, StoreError> {
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch()).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let adj_closes: Vec<f64> = bars.iter().map(|b| b.adjusted_close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("adjusted_close".into(), adj_closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<QuoteBar>, String> {
    let col = |name: &str| df.column(name).map_err(|e| format!("column '{name}': {e}"));
    let f64_col = |name: &str| -> Result<Vec<Option<f64>>, String> {
        Ok(col(name)?
            .f64()
            .map_err(|e| format!("column '{name}' type: {e}"))?
            .into_iter()
            .collect())
    };

    let dates = col("date")?
        .date()
        .map_err(|e| format!("column 'date' type: {e}"))?
        .clone();
    let opens = f64_col("open")?;
    let highs = f64_col("high")?;
    let lows = f64_col("low")?;
    let closes = f64_col("close")?;
    let adj_closes = f64_col("adjusted_close")?;
    let volumes: Vec<Option<u64>> = col("volume")?
        .u64()
        .map_err(|e| format!("column 'volume' type: {e}"))?
        .into_iter()
        .collect();

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = dates.get(i).ok_or_else(|| format!("null date at row {i}"))?;
        bars.push(QuoteBar {
            date: epoch() + chrono::Duration::days(days as i64),
            open: opens[i].unwrap_or(f64::NAN),
            high: highs[i].unwrap_or(f64::NAN),
            low: lows[i].unwrap_or(f64::NAN),
            close: closes[i].unwrap_or(f64::NAN),
            adjusted_close: adj_closes[i].unwrap_or(f64::NAN),
            volume: volumes[i].unwrap_or(0),
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> QuoteSeries {
        let bar = |d: u32, close: f64| QuoteBar {
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            adjusted_close: close * 0.98,
            volume: 1000 + d as u64,
        };
        QuoteSeries::from_bars(vec![bar(2, 100.0), bar(3, 101.0), bar(4, 99.5)]).unwrap()
    }

    #[test]
    fn sanitizes_like_a_filename() {
        assert_eq!(sanitize_ticker("BRK/B US"), "brk_b_us");
        assert_eq!(sanitize_ticker("REI-U CN"), "rei-u_cn");
        assert_eq!(sanitize_ticker("WALMEX* MF"), "walmex__mf");
        assert_eq!(sanitize_ticker("7203 JP"), "7203_jp");
    }

    #[test]
    fn sanitize_keeps_unicode_letters() {
        assert_eq!(sanitize_ticker("ÄBB SS"), "äbb_ss");
        assert_eq!(sanitize_ticker("NESTLÉ/N SW"), "nestlé_n_sw");
    }

    #[test]
    fn epoch_is_unix_epoch() {
        assert_eq!(epoch(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path());
        let series = sample_series();

        let path = store.write("VOD LN", &series).unwrap();
        assert_eq!(path, dir.path().join("vod_ln.parquet"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let loaded = store.load("VOD LN").unwrap().unwrap();
        assert_eq!(loaded, series);
    }

    #[test]
    fn load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path());
        assert!(store.load("NOPE US").unwrap().is_none());
    }

    #[test]
    fn colliding_names_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path());
        assert_eq!(store.path_for("A/B US"), store.path_for("A*B US"));
        store.write("A/B US", &sample_series()).unwrap();
        store.write("A*B US", &sample_series()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn concurrent_colliding_writes_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path());
        let series = sample_series();
        let tickers: Vec<String> = "/*.&+!#$%".chars().map(|c| format!("A{c}B US")).collect();

        let (store_ref, series_ref) = (&store, &series);
        std::thread::scope(|s| {
            let handles: Vec<_> = tickers
                .iter()
                .map(|t| s.spawn(move || store_ref.write(t, series_ref)))
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });

        // one final file, no temp leftovers
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(store.load("A/B US").unwrap().unwrap(), series);
    }
}
