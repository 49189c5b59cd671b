//! Quote provider trait and the shared OHLCV shape.
//!
//! The QuoteProvider trait abstracts over the two upstream sources (EODHD
//! JSON, Yahoo CSV) so the download pipeline can treat them alike and tests
//! can substitute mocks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily OHLCV record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: u64,
}

/// Daily bars with strictly increasing dates and at least two rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSeries {
    bars: Vec<QuoteBar>,
}

impl QuoteSeries {
    /// Fewer rows than this cannot form a time series.
    pub const MIN_ROWS: usize = 2;

    /// Sort by date, keep the first bar of each date, and reject short results.
    ///
    /// Returns `None` for zero or one distinct date.
    pub fn from_bars(mut bars: Vec<QuoteBar>) -> Option<Self> {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        if bars.len() < Self::MIN_ROWS {
            return None;
        }
        Some(Self { bars })
    }

    pub fn bars(&self) -> &[QuoteBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }
}

/// A completed request: the series (if the upstream had one) and the HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub series: Option<QuoteSeries>,
    pub status: u16,
}

impl FetchOutcome {
    pub fn no_data(status: u16) -> Self {
        Self {
            series: None,
            status,
        }
    }

    /// Row count for the status ledger; `-1` when there is no series.
    pub fn row_count(&self) -> i64 {
        self.series.as_ref().map_or(-1, |s| s.len() as i64)
    }
}

/// Failures that are worth retrying: the request or the payload went wrong.
///
/// "No data" is not an error; it is a [`FetchOutcome`] without a series.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error for {ticker}: {message}")]
    Network { ticker: String, message: String },

    #[error("HTTP {status} for {ticker}")]
    Http { ticker: String, status: u16 },

    #[error("malformed response for {ticker}: {message}")]
    Malformed { ticker: String, message: String },
}

impl FetchError {
    pub(crate) fn network(ticker: &str, err: reqwest::Error) -> Self {
        FetchError::Network {
            ticker: ticker.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(ticker: &str, message: impl Into<String>) -> Self {
        FetchError::Malformed {
            ticker: ticker.to_string(),
            message: message.into(),
        }
    }
}

/// A source of daily quote history.
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for `vendor_ticker` from `start` to today.
    fn fetch(&self, vendor_ticker: &str, start: NaiveDate) -> Result<FetchOutcome, FetchError>;
}

pub(crate) fn http_client(timeout: std::time::Duration) -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(y: i32, m: u32, d: u32, close: f64) -> QuoteBar {
        QuoteBar {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            adjusted_close: close,
            volume: 100,
        }
    }

    #[test]
    fn sorts_and_dedupes_dates() {
        let series = QuoteSeries::from_bars(vec![
            bar(2024, 1, 3, 2.0),
            bar(2024, 1, 2, 1.0),
            bar(2024, 1, 3, 9.0),
        ])
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.bars()[1].close, 2.0);
    }

    #[test]
    fn single_row_is_no_data() {
        assert!(QuoteSeries::from_bars(vec![bar(2024, 1, 2, 1.0)]).is_none());
        assert!(QuoteSeries::from_bars(Vec::new()).is_none());
        // two rows on the same date collapse to one
        assert!(QuoteSeries::from_bars(vec![bar(2024, 1, 2, 1.0), bar(2024, 1, 2, 1.0)]).is_none());
    }

    #[test]
    fn row_count_sentinel() {
        assert_eq!(FetchOutcome::no_data(404).row_count(), -1);
        let series = QuoteSeries::from_bars(vec![bar(2024, 1, 2, 1.0), bar(2024, 1, 3, 1.0)]);
        let outcome = FetchOutcome { series, status: 200 };
        assert_eq!(outcome.row_count(), 2);
    }
}
