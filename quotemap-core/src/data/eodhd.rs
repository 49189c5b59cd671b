//! EODHD (eodhistoricaldata.com) end-of-day provider.
//!
//! One GET per ticker against `/api/eod/{ticker}` with `fmt=json`. A non-2xx
//! status or an empty body means the provider has nothing for the ticker; a
//! 2xx body that is not the expected JSON array is an error.

use super::provider::{http_client, FetchError, FetchOutcome, QuoteBar, QuoteProvider, QuoteSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// One element of the EODHD JSON array.
#[derive(Debug, Deserialize)]
struct EodRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adjusted_close: Option<f64>,
    volume: Option<f64>,
}

impl EodRow {
    fn into_bar(self) -> Option<QuoteBar> {
        Some(QuoteBar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            adjusted_close: self.adjusted_close?,
            volume: self.volume?.max(0.0) as u64,
        })
    }
}

pub struct EodhdProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_token: String,
}

impl EodhdProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        })
    }

    fn eod_url(&self, ticker: &str, start: NaiveDate) -> String {
        format!(
            "{}/api/eod/{ticker}?from={}&fmt=json&api_token={}",
            self.base_url,
            start.format("%Y-%m-%d"),
            self.api_token
        )
    }

    /// Interpret a response body.
    pub fn parse_response(ticker: &str, status: u16, body: &str) -> Result<FetchOutcome, FetchError> {
        if !(200..300).contains(&status) || body.trim().is_empty() {
            return Ok(FetchOutcome::no_data(status));
        }

        let rows: Vec<EodRow> = serde_json::from_str(body)
            .map_err(|e| FetchError::malformed(ticker, format!("expected JSON array: {e}")))?;

        let bars = rows.into_iter().filter_map(EodRow::into_bar).collect();
        Ok(FetchOutcome {
            series: QuoteSeries::from_bars(bars),
            status,
        })
    }
}

impl QuoteProvider for EodhdProvider {
    fn name(&self) -> &str {
        "eodhd"
    }

    fn fetch(&self, vendor_ticker: &str, start: NaiveDate) -> Result<FetchOutcome, FetchError> {
        let resp = self
            .client
            .get(self.eod_url(vendor_ticker, start))
            .send()
            .map_err(|e| FetchError::network(vendor_ticker, e))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| FetchError::network(vendor_ticker, e))?;
        Self::parse_response(vendor_ticker, status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_DAYS: &str = r#"[
        {"date":"2024-01-03","open":11.0,"high":12.0,"low":10.5,"close":11.5,"adjusted_close":11.4,"volume":2000},
        {"date":"2024-01-02","open":10.0,"high":11.0,"low":9.5,"close":10.5,"adjusted_close":10.4,"volume":1000}
    ]"#;

    #[test]
    fn url_layout() {
        let provider =
            EodhdProvider::new("https://eodhd.example/", "tok", Duration::from_secs(1)).unwrap();
        assert_eq!(
            provider.eod_url("VOD.LSE", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()),
            "https://eodhd.example/api/eod/VOD.LSE?from=2000-01-01&fmt=json&api_token=tok"
        );
    }

    #[test]
    fn parses_and_sorts_rows() {
        let outcome = EodhdProvider::parse_response("VOD.LSE", 200, TWO_DAYS).unwrap();
        assert_eq!(outcome.status, 200);
        let series = outcome.series.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.bars()[0].adjusted_close, 10.4);
        assert_eq!(series.bars()[1].volume, 2000);
    }

    #[test]
    fn non_success_status_is_no_data() {
        let outcome = EodhdProvider::parse_response("NOPE.US", 404, "Ticker Not Found.").unwrap();
        assert_eq!(outcome, FetchOutcome::no_data(404));
        assert_eq!(outcome.row_count(), -1);
    }

    #[test]
    fn empty_array_and_body_are_no_data() {
        assert!(EodhdProvider::parse_response("X.US", 200, "[]").unwrap().series.is_none());
        assert!(EodhdProvider::parse_response("X.US", 200, "  ").unwrap().series.is_none());
    }

    #[test]
    fn single_row_is_no_data() {
        let body = r#"[{"date":"2024-01-02","open":1,"high":1,"low":1,"close":1,"adjusted_close":1,"volume":5}]"#;
        let outcome = EodhdProvider::parse_response("X.US", 200, body).unwrap();
        assert!(outcome.series.is_none());
        assert_eq!(outcome.status, 200);
    }

    #[test]
    fn non_json_body_is_an_error() {
        let err = EodhdProvider::parse_response("X.US", 200, "<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[test]
    fn rows_with_nulls_are_dropped() {
        let body = r#"[
            {"date":"2024-01-02","open":1,"high":1,"low":1,"close":1,"adjusted_close":1,"volume":5},
            {"date":"2024-01-03","open":null,"high":1,"low":1,"close":1,"adjusted_close":1,"volume":5},
            {"date":"2024-01-04","open":1,"high":1,"low":1,"close":1,"adjusted_close":1,"volume":5}
        ]"#;
        let series = EodhdProvider::parse_response("X.US", 200, body).unwrap().series.unwrap();
        assert_eq!(series.len(), 2);
    }
}
