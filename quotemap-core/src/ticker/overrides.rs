//! Manual vendor-ticker corrections.
//!
//! A hand-curated `old,new` CSV fixes tickers the rules get wrong (renames,
//! odd share-class spellings). Lookup is exact-match and is the last rewrite
//! a vendor ticker goes through.

use crate::reference::{column_index, read_local, ReferenceError};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    corrections: HashMap<String, String>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(old, new)` pairs; a repeated `old` keeps its last `new`.
    pub fn from_pairs<I, O, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (O, N)>,
        O: Into<String>,
        N: Into<String>,
    {
        Self {
            corrections: pairs
                .into_iter()
                .map(|(old, new)| (old.into(), new.into()))
                .collect(),
        }
    }

    /// Load the override CSV from disk. A missing or malformed file is an error.
    pub fn from_file(path: &Path) -> Result<Self, ReferenceError> {
        let bytes = read_local(path)?;
        Self::from_csv(&bytes, &path.display().to_string())
    }

    /// Parse an override CSV with `old` and `new` columns.
    pub fn from_csv(bytes: &[u8], location: &str) -> Result<Self, ReferenceError> {
        let mut reader = csv::ReaderBuilder::new().from_reader(bytes);
        let headers = reader
            .headers()
            .map_err(|e| ReferenceError::csv(location, e))?
            .clone();
        let old_idx = column_index(&headers, &["old"], location)?;
        let new_idx = column_index(&headers, &["new"], location)?;

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReferenceError::csv(location, e))?;
            let old = record.get(old_idx).map(str::trim).unwrap_or_default();
            let new = record.get(new_idx).map(str::trim).unwrap_or_default();
            if old.is_empty() || new.is_empty() {
                continue;
            }
            pairs.push((old.to_string(), new.to_string()));
        }
        Ok(Self::from_pairs(pairs))
    }

    /// Correction for `vendor_ticker`, if one is recorded.
    pub fn get(&self, vendor_ticker: &str) -> Option<&str> {
        self.corrections.get(vendor_ticker).map(String::as_str)
    }

    /// Replace `vendor_ticker` with its correction when one exists.
    pub fn apply(&self, vendor_ticker: String) -> String {
        match self.get(&vendor_ticker) {
            Some(new) => new.to_string(),
            None => vendor_ticker,
        }
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_only() {
        let store = OverrideStore::from_pairs([("BRKB.US", "BRK-B.US")]);
        assert_eq!(store.apply("BRKB.US".into()), "BRK-B.US");
        assert_eq!(store.apply("BRKB.US2".into()), "BRKB.US2");
        assert_eq!(store.apply("brkb.us".into()), "brkb.us");
    }

    #[test]
    fn parses_csv_and_skips_blank_rows() {
        let csv = b"old,new\nFOO.LSE,FOOX.LSE\n,BAR.US\nBAZ.US,\n";
        let store = OverrideStore::from_csv(csv, "overrides.csv").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("FOO.LSE"), Some("FOOX.LSE"));
    }

    #[test]
    fn missing_new_column_is_rejected() {
        let csv = b"old,replacement\nFOO.LSE,FOOX.LSE\n";
        assert!(OverrideStore::from_csv(csv, "overrides.csv").is_err());
    }

    #[test]
    fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = OverrideStore::from_file(&dir.path().join("none.csv")).unwrap_err();
        assert!(matches!(err, ReferenceError::Io { .. }));
    }
}
