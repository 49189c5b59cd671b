//! Canonical ↔ alias ticker table.
//!
//! The alias is the Yahoo spelling of a canonical ticker (`"7203 JP"` ↔
//! `"7203.T"`). It is the vendor ticker for alternate-vendor exchanges and a
//! prefix/suffix donor for some EODHD exchanges.

use crate::reference::{column_index, ReferenceError};
use std::collections::{HashMap, HashSet};

const CANONICAL_COLUMNS: &[&str] = &["canonical_ticker", "bloomberg_ticker"];
const ALIAS_COLUMNS: &[&str] = &["alias", "yahoo"];

/// Bidirectional canonical ↔ alias lookup.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    to_alias: HashMap<String, String>,
    to_canonical: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(canonical, alias)` pairs.
    ///
    /// Both fields are upper-cased, pairs with an empty field are dropped, and
    /// only the first pair for each alias is kept. Among the survivors a
    /// canonical ticker listed twice resolves to its last alias.
    pub fn from_pairs<I, C, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, A)>,
        C: AsRef<str>,
        A: AsRef<str>,
    {
        let mut seen_aliases = HashSet::new();
        let mut table = Self::new();
        for (canonical, alias) in pairs {
            let canonical = canonical.as_ref().trim().to_uppercase();
            let alias = alias.as_ref().trim().to_uppercase();
            if canonical.is_empty() || alias.is_empty() {
                continue;
            }
            if !seen_aliases.insert(alias.clone()) {
                continue;
            }
            table.to_alias.insert(canonical.clone(), alias.clone());
            table.to_canonical.insert(alias, canonical);
        }
        table
    }

    /// Parse the published ticker map CSV.
    ///
    /// The file carries more columns than the two used here; a row with any
    /// empty field is dropped before the pair is considered.
    pub fn from_csv(bytes: &[u8], location: &str) -> Result<Self, ReferenceError> {
        let mut reader = csv::ReaderBuilder::new().from_reader(bytes);
        let headers = reader
            .headers()
            .map_err(|e| ReferenceError::csv(location, e))?
            .clone();
        let canonical_idx = column_index(&headers, CANONICAL_COLUMNS, location)?;
        let alias_idx = column_index(&headers, ALIAS_COLUMNS, location)?;

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReferenceError::csv(location, e))?;
            if record.iter().any(|field| field.trim().is_empty()) {
                continue;
            }
            if let (Some(canonical), Some(alias)) = (record.get(canonical_idx), record.get(alias_idx))
            {
                pairs.push((canonical.to_string(), alias.to_string()));
            }
        }
        Ok(Self::from_pairs(pairs))
    }

    pub fn alias_for(&self, canonical: &str) -> Option<&str> {
        self.to_alias.get(canonical).map(String::as_str)
    }

    pub fn canonical_for(&self, alias: &str) -> Option<&str> {
        self.to_canonical.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_alias.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_go_both_ways() {
        let table = AliasTable::from_pairs([("7203 JP", "7203.t")]);
        assert_eq!(table.alias_for("7203 JP"), Some("7203.T"));
        assert_eq!(table.canonical_for("7203.T"), Some("7203 JP"));
        assert_eq!(table.alias_for("7203 JT"), None);
    }

    #[test]
    fn first_row_wins_for_a_duplicate_alias() {
        let table = AliasTable::from_pairs([("AAA US", "AAA"), ("AAA2 US", "AAA")]);
        assert_eq!(table.canonical_for("AAA"), Some("AAA US"));
        assert_eq!(table.alias_for("AAA2 US"), None);
    }

    #[test]
    fn last_alias_wins_for_a_duplicate_canonical() {
        let table = AliasTable::from_pairs([("BBB US", "BBB"), ("BBB US", "BBB.X")]);
        assert_eq!(table.alias_for("BBB US"), Some("BBB.X"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn csv_drops_incomplete_rows_and_uppercases() {
        let csv = b"ticker,bloomberg_ticker,yahoo\n\
                    vod,vod ln,vod.l\n\
                    sony,6758 JP,\n\
                    ,700 HK,0700.hk\n\
                    ericb,ERICB SS,ERIC-B.ST\n";
        let table = AliasTable::from_csv(csv, "map.csv").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.alias_for("VOD LN"), Some("VOD.L"));
        assert_eq!(table.alias_for("6758 JP"), None);
        assert_eq!(table.alias_for("700 HK"), None);
        assert_eq!(table.alias_for("ERICB SS"), Some("ERIC-B.ST"));
    }

    #[test]
    fn csv_without_alias_column_is_rejected() {
        let csv = b"bloomberg_ticker,ticker\nVOD LN,VOD\n";
        assert!(matches!(
            AliasTable::from_csv(csv, "map.csv"),
            Err(ReferenceError::MissingColumn { .. })
        ));
    }
}
