//! Yahoo Finance CSV download provider (the alternate vendor).
//!
//! Fetches daily history from the v7 download endpoint bounded by epoch
//! timestamps. Yahoo has no official API and drops rows to `null` on
//! non-trading days, so incomplete rows are discarded before the series is
//! built. An HTTP error status is treated as a failed request, not as an
//! empty result.

use super::provider::{http_client, FetchError, FetchOutcome, QuoteBar, QuoteProvider, QuoteSeries};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;

/// One CSV row as published; every field may be empty or `null`.
#[derive(Debug, Deserialize)]
struct DownloadRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: String,
    #[serde(rename = "High")]
    high: String,
    #[serde(rename = "Low")]
    low: String,
    #[serde(rename = "Close")]
    close: String,
    #[serde(rename = "Adj Close")]
    adj_close: String,
    #[serde(rename = "Volume")]
    volume: String,
}

impl DownloadRow {
    fn is_complete(&self) -> bool {
        [
            &self.date,
            &self.open,
            &self.high,
            &self.low,
            &self.close,
            &self.adj_close,
            &self.volume,
        ]
        .iter()
        .all(|f| {
            let f = f.trim();
            !f.is_empty() && f != "null"
        })
    }

    fn into_bar(self, ticker: &str) -> Result<QuoteBar, FetchError> {
        let num = |field: &str, name: &str| -> Result<f64, FetchError> {
            field
                .trim()
                .parse::<f64>()
                .map_err(|e| FetchError::malformed(ticker, format!("bad {name} '{field}': {e}")))
        };
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|e| FetchError::malformed(ticker, format!("bad date '{}': {e}", self.date)))?;
        Ok(QuoteBar {
            date,
            open: num(&self.open, "open")?,
            high: num(&self.high, "high")?,
            low: num(&self.low, "low")?,
            close: num(&self.close, "close")?,
            adjusted_close: num(&self.adj_close, "adj close")?,
            volume: num(&self.volume, "volume")?.max(0.0) as u64,
        })
    }
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the download URL for `ticker` from `start` (UTC midnight) to `end_epoch`.
    fn download_url(&self, ticker: &str, start: NaiveDate, end_epoch: i64) -> String {
        let start_epoch = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        format!(
            "{}/v7/finance/download/{ticker}\
             ?period1={start_epoch}&period2={end_epoch}&interval=1d\
             &events=history&includeAdjustedClose=true",
            self.base_url
        )
    }

    /// Interpret a download response body.
    pub fn parse_response(ticker: &str, status: u16, body: &str) -> Result<FetchOutcome, FetchError> {
        if !(200..300).contains(&status) {
            return Err(FetchError::Http {
                ticker: ticker.to_string(),
                status,
            });
        }

        let mut reader = csv::Reader::from_reader(body.as_bytes());
        let mut bars = Vec::new();
        for row in reader.deserialize::<DownloadRow>() {
            let row = row.map_err(|e| FetchError::malformed(ticker, e.to_string()))?;
            if row.is_complete() {
                bars.push(row.into_bar(ticker)?);
            }
        }

        Ok(FetchOutcome {
            series: QuoteSeries::from_bars(bars),
            status,
        })
    }
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch(&self, vendor_ticker: &str, start: NaiveDate) -> Result<FetchOutcome, FetchError> {
        let url = self.download_url(vendor_ticker, start, Utc::now().timestamp());
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::network(vendor_ticker, e))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| FetchError::network(vendor_ticker, e))?;
        Self::parse_response(vendor_ticker, status, &body)
    }
}
