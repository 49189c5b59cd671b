//! Reference file loading.
//!
//! Universe lists and the alias table are published as CSV files on a public
//! bucket; the override table and the mapping table live on local disk. A
//! reference location is either an `http(s)://` URL or a filesystem path, and
//! every loader goes through [`ReferenceLoader`] so tests can point at local
//! fixtures.
//!
//! Any failure here is fatal for the command that needed the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from reading reference, override or mapping files.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("malformed CSV in {location}: {message}")]
    Csv { location: String, message: String },

    #[error("{location} has no column named any of {expected:?}")]
    MissingColumn {
        location: String,
        expected: Vec<String>,
    },

    #[error("{location} is empty")]
    Empty { location: String },

    #[error("{location} lists '{ticker}' more than once")]
    DuplicateTicker { location: String, ticker: String },
}

impl ReferenceError {
    pub(crate) fn csv(location: &str, err: impl std::fmt::Display) -> Self {
        ReferenceError::Csv {
            location: location.to_string(),
            message: err.to_string(),
        }
    }
}

/// Reads reference files from URLs or local paths.
pub struct ReferenceLoader {
    client: reqwest::blocking::Client,
}

impl ReferenceLoader {
    pub fn new(timeout: Duration) -> Result<Self, ReferenceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReferenceError::Http {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Fetch the raw bytes at `location`.
    pub fn fetch(&self, location: &str) -> Result<Vec<u8>, ReferenceError> {
        if is_url(location) {
            debug!(url = location, "fetching reference file");
            let http_err = |e: reqwest::Error| ReferenceError::Http {
                url: location.to_string(),
                message: e.to_string(),
            };
            let resp = self.client.get(location).send().map_err(http_err)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(ReferenceError::Http {
                    url: location.to_string(),
                    message: format!("HTTP {status}"),
                });
            }
            Ok(resp.bytes().map_err(http_err)?.to_vec())
        } else {
            read_local(Path::new(location))
        }
    }
}

/// Read a local file, mapping the error to [`ReferenceError::Io`].
pub fn read_local(path: &Path) -> Result<Vec<u8>, ReferenceError> {
    fs::read(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Index of the first header matching any of `names`.
pub(crate) fn column_index(
    headers: &csv::StringRecord,
    names: &[&str],
    location: &str,
) -> Result<usize, ReferenceError> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
        .ok_or_else(|| ReferenceError::MissingColumn {
            location: location.to_string(),
            expected: names.iter().map(|n| n.to_string()).collect(),
        })
}

/// Non-empty values of the first column matching any of `names`.
pub fn read_column(
    bytes: &[u8],
    names: &[&str],
    location: &str,
) -> Result<Vec<String>, ReferenceError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| ReferenceError::csv(location, e))?
        .clone();
    let idx = column_index(&headers, names, location)?;
    collect_column(&mut reader, idx, location)
}

/// Non-empty values of the first column, whatever its header.
pub fn read_first_column(bytes: &[u8], location: &str) -> Result<Vec<String>, ReferenceError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| ReferenceError::csv(location, e))?;
    if headers.is_empty() {
        return Err(ReferenceError::Empty {
            location: location.to_string(),
        });
    }
    collect_column(&mut reader, 0, location)
}

fn collect_column(
    reader: &mut csv::Reader<&[u8]>,
    idx: usize,
    location: &str,
) -> Result<Vec<String>, ReferenceError> {
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReferenceError::csv(location, e))?;
        if let Some(value) = record.get(idx).map(str::trim) {
            if !value.is_empty() {
                values.push(value.to_string());
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_column_skipping_blanks() {
        let csv = b"ticker,bloomberg_ticker,target\nA,AAA US,0.5\nB,,0.25\nC,CCC LN,0.75\n";
        let values = read_column(csv, &["canonical_ticker", "bloomberg_ticker"], "t").unwrap();
        assert_eq!(values, vec!["AAA US", "CCC LN"]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = b"foo,bar\n1,2\n";
        let err = read_column(csv, &["bloomberg_ticker"], "t").unwrap_err();
        assert!(matches!(err, ReferenceError::MissingColumn { .. }));
    }

    #[test]
    fn first_column_ignores_header_name() {
        let csv = b"bloomberg_ticker\nAAA US\nBBB LN\n";
        assert_eq!(read_first_column(csv, "t").unwrap(), vec!["AAA US", "BBB LN"]);
    }

    #[test]
    fn local_fetch_of_missing_file_fails() {
        let loader = ReferenceLoader::new(Duration::from_secs(1)).unwrap();
        let err = loader.fetch("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, ReferenceError::Io { .. }));
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/a.csv"));
        assert!(is_url("http://example.com/a.csv"));
        assert!(!is_url("db/eodhd-overrides.csv"));
    }
}
