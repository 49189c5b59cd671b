//! Quote data layer: upstream providers and the on-disk quote store.

pub mod eodhd;
pub mod provider;
pub mod store;
pub mod yahoo;

pub use eodhd::EodhdProvider;
pub use provider::{FetchError, FetchOutcome, QuoteBar, QuoteProvider, QuoteSeries};
pub use store::{sanitize_ticker, QuoteStore, StoreError};
pub use yahoo::YahooProvider;
