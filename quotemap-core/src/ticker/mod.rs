//! Canonical ticker → vendor ticker normalization.

pub mod alias;
pub mod converter;
pub mod normalize;
pub mod overrides;

pub use alias::AliasTable;
pub use converter::{
    exchange_code, rule_for, symbol_part, ConverterRule, Provider, SuffixSource, TickerSource,
    EXCHANGE_CODES,
};
pub use normalize::{apply_replacements, derive_vendor_ticker, normalize, REPLACEMENTS};
pub use overrides::OverrideStore;
