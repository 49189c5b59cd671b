//! Ticker universe — the set of canonical tickers to map and download.
//!
//! Two published lists feed it: the historical training universe (every
//! ticker that ever had a target) and the live universe (tickers eligible
//! this round). The full universe is their union.

use crate::reference::{read_column, read_first_column, ReferenceError, ReferenceLoader};
use std::collections::BTreeSet;
use tracing::info;

const HISTORICAL_COLUMNS: &[&str] = &["canonical_ticker", "bloomberg_ticker"];

/// Sorted, de-duplicated set of canonical tickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Universe {
    tickers: BTreeSet<String>,
}

impl Universe {
    pub fn from_tickers<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the historical universe CSV (`bloomberg_ticker` column).
    pub fn historical_from_csv(bytes: &[u8], location: &str) -> Result<Self, ReferenceError> {
        Ok(Self::from_tickers(read_column(bytes, HISTORICAL_COLUMNS, location)?))
    }

    /// Parse the live universe CSV (single column, any header).
    pub fn live_from_csv(bytes: &[u8], location: &str) -> Result<Self, ReferenceError> {
        Ok(Self::from_tickers(read_first_column(bytes, location)?))
    }

    pub fn union(&self, other: &Universe) -> Universe {
        Universe {
            tickers: self.tickers.union(&other.tickers).cloned().collect(),
        }
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.tickers.contains(ticker)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tickers.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Fetch and parse the historical universe.
pub fn load_historical(loader: &ReferenceLoader, location: &str) -> Result<Universe, ReferenceError> {
    info!(location, "reading historical universe");
    let universe = Universe::historical_from_csv(&loader.fetch(location)?, location)?;
    info!(tickers = universe.len(), "historical universe loaded");
    Ok(universe)
}

/// Fetch and parse the live universe.
pub fn load_live(loader: &ReferenceLoader, location: &str) -> Result<Universe, ReferenceError> {
    info!(location, "reading live universe");
    let universe = Universe::live_from_csv(&loader.fetch(location)?, location)?;
    info!(tickers = universe.len(), "live universe loaded");
    Ok(universe)
}
