//! Download status ledger — one CSV line per fetch attempt.
//!
//! The file is truncated when a run starts. Workers share one writer behind a
//! mutex and every record is flushed before the lock is released, so a line
//! is never interleaved with another and survives a crash mid-run.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use quotemap_core::ticker::Provider;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Row count recorded when there is no vendor ticker or the upstream had no data.
pub const COUNT_NO_DATA: i64 = -1;

/// Row count recorded when the attempt raised an error.
pub const COUNT_FAILED: i64 = -3;

const HEADER: [&str; 6] = [
    "bloomberg_ticker",
    "yahoo_ticker",
    "data_provider",
    "signals_ticker",
    "count",
    "status",
];

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One fetch attempt as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(rename = "bloomberg_ticker")]
    pub canonical_ticker: String,
    #[serde(rename = "yahoo_ticker")]
    pub alias_ticker: String,
    #[serde(rename = "data_provider")]
    pub provider: Provider,
    #[serde(rename = "signals_ticker")]
    pub vendor_ticker: String,
    /// Row count, [`COUNT_NO_DATA`] or [`COUNT_FAILED`].
    pub count: i64,
    /// HTTP status code or error text.
    pub status: String,
}

/// Shared append target for status records.
pub struct StatusLedger {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl StatusLedger {
    /// Truncate (or create) the ledger file and write the header.
    pub fn create(path: &Path) -> Result<Self, LedgerError> {
        let io_err = |source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush().map_err(io_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it.
    pub fn append(&self, record: &StatusRecord) -> Result<(), LedgerError> {
        // Poisoning is ignored; a record is always flushed before unlock.
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.serialize(record)?;
        writer.flush().map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Read every record back from a ledger file.
    pub fn read_all(path: &Path) -> Result<Vec<StatusRecord>, LedgerError> {
        let mut reader = csv::Reader::from_path(path)?;
        reader
            .deserialize()
            .collect::<Result<Vec<StatusRecord>, _>>()
            .map_err(LedgerError::from)
    }
}
