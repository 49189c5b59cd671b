//! Mapping table: the interchange artifact between `build-map` and `download`.
//!
//! One row per canonical ticker, kept sorted by canonical ticker so the CSV a
//! build writes is byte-identical for identical inputs.

use crate::reference::{read_local, ReferenceError};
use crate::ticker::{normalize, AliasTable, OverrideStore, Provider};
use crate::universe::Universe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A canonical ticker and where to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    pub canonical_ticker: String,
    /// Yahoo spelling, recorded for auditing only.
    pub alias: Option<String>,
    pub provider: Provider,
    pub vendor_ticker: Option<String>,
}

impl MappingRow {
    /// Vendor ticker, or `""` when the row is unmapped.
    pub fn vendor_ticker_str(&self) -> &str {
        self.vendor_ticker.as_deref().unwrap_or_default()
    }

    pub fn alias_str(&self) -> &str {
        self.alias.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    rows: BTreeMap<String, MappingRow>,
}

impl MappingTable {
    /// Normalize every ticker in the universe.
    pub fn build(universe: &Universe, aliases: &AliasTable, overrides: &OverrideStore) -> Self {
        Self::from_rows(
            universe
                .iter()
                .map(|ticker| normalize(ticker, aliases, overrides)),
        )
    }

    /// Collect rows; a repeated canonical ticker keeps its last row.
    pub fn from_rows(rows: impl IntoIterator<Item = MappingRow>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| (row.canonical_ticker.clone(), row))
                .collect(),
        }
    }

    pub fn get(&self, canonical: &str) -> Option<&MappingRow> {
        self.rows.get(canonical)
    }

    /// Rows in canonical-ticker order.
    pub fn rows(&self) -> impl Iterator<Item = &MappingRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only rows whose canonical ticker is in `universe`.
    pub fn restrict_to(&self, universe: &Universe) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|(ticker, _)| universe.contains(ticker))
                .map(|(ticker, row)| (ticker.clone(), row.clone()))
                .collect(),
        }
    }

    /// Row count per provider.
    pub fn provider_counts(&self) -> BTreeMap<Provider, usize> {
        let mut counts = BTreeMap::new();
        for row in self.rows.values() {
            *counts.entry(row.provider).or_insert(0) += 1;
        }
        counts
    }

    /// Serialize to CSV with header `canonical_ticker,alias,provider,vendor_ticker`.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, ReferenceError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in self.rows.values() {
            writer
                .serialize(row)
                .map_err(|e| ReferenceError::csv("mapping table", e))?;
        }
        writer
            .into_inner()
            .map_err(|e| ReferenceError::csv("mapping table", e))
    }

    /// BLAKE3 hex digest of the CSV serialization.
    pub fn fingerprint(&self) -> Result<String, ReferenceError> {
        Ok(blake3::hash(&self.to_csv_bytes()?).to_hex().to_string())
    }

    /// Write the table to `path`, creating parent directories.
    ///
    /// The file is written to a `.tmp` sibling and renamed into place.
    pub fn save(&self, path: &Path) -> Result<(), ReferenceError> {
        let io_err = |source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = self.to_csv_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, bytes).map_err(io_err)?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(e)
        })
    }

    /// Load a previously saved table.
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let bytes = read_local(path)?;
        Self::from_csv(&bytes, &path.display().to_string())
    }

    /// Parse a mapping CSV. Duplicate canonical tickers are rejected.
    pub fn from_csv(bytes: &[u8], location: &str) -> Result<Self, ReferenceError> {
        let mut reader = csv::Reader::from_reader(bytes);
        let mut rows = BTreeMap::new();
        for row in reader.deserialize::<MappingRow>() {
            let row = row.map_err(|e| ReferenceError::csv(location, e))?;
            if rows.contains_key(&row.canonical_ticker) {
                return Err(ReferenceError::DuplicateTicker {
                    location: location.to_string(),
                    ticker: row.canonical_ticker,
                });
            }
            rows.insert(row.canonical_ticker.clone(), row);
        }
        Ok(Self { rows })
    }
}
