//! Ticker normalization engine.
//!
//! Turns one canonical ticker into a [`MappingRow`] in four stages:
//! rule lookup by exchange code, prefix/suffix derivation, spelling cleanup
//! via [`REPLACEMENTS`], and a final exact-match override. The result depends
//! only on the inputs.

use super::alias::AliasTable;
use super::converter::{
    exchange_code, rule_for, split_last, symbol_part, ConverterRule, Provider, SuffixSource,
    TickerSource,
};
use super::overrides::OverrideStore;
use crate::mapping::MappingRow;

/// Ordered literal substring rewrites applied to every derived vendor ticker.
///
/// Each rule replaces all occurrences and feeds the next. `"//."` must run
/// before `"/."`, which is a substring of it.
pub const REPLACEMENTS: &[(&str, &str)] = &[
    ("-U.TO", "-UN.TO"),
    ("/P.MC", "-P.MC"),
    ("/2.US", ".US"),
    ("/B.", "-B."),
    ("/A.", "-A."),
    ("/X.", "-X."),
    ("//.", "."),
    ("/.", "."),
    ("*.MX", ".MX"),
];

/// Width Hong Kong numeric symbols are zero-padded to.
const PADDED_WIDTH: usize = 4;

/// Run the replacement list over `ticker`.
pub fn apply_replacements(ticker: &str) -> String {
    REPLACEMENTS
        .iter()
        .fold(ticker.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Vendor ticker a rule produces before cleanup and overrides.
///
/// Empty for `Ignore` rules and for alternate-vendor tickers without an alias.
pub fn derive_vendor_ticker(canonical: &str, rule: &ConverterRule, alias: Option<&str>) -> String {
    match *rule {
        ConverterRule::Ignore => String::new(),
        ConverterRule::AltVendor => alias.unwrap_or_default().to_string(),
        ConverterRule::Eodhd {
            ticker_source,
            suffix_source,
            suffix,
        } => {
            let symbol = symbol_part(canonical);
            let prefix = match (ticker_source, alias) {
                (TickerSource::FromAlias, Some(alias)) => split_last(alias, '.').0.to_string(),
                (TickerSource::FromCanonicalPadded, _) => {
                    format!("{symbol:0>width$}", width = PADDED_WIDTH)
                }
                _ => symbol.to_string(),
            };
            let suffix = match (suffix_source, alias) {
                (SuffixSource::FromAlias, Some(alias)) => format!(".{}", split_last(alias, '.').1),
                _ => suffix.to_string(),
            };
            prefix + &suffix
        }
    }
}

/// Map a canonical ticker to its provider and vendor ticker.
pub fn normalize(canonical: &str, aliases: &AliasTable, overrides: &OverrideStore) -> MappingRow {
    let alias = aliases.alias_for(canonical);

    let (provider, vendor_ticker) = match rule_for(exchange_code(canonical)) {
        None => (Provider::Ignore, String::new()),
        Some(rule) => {
            let derived = derive_vendor_ticker(canonical, &rule, alias);
            let vendor_ticker = if derived.is_empty() {
                derived
            } else {
                overrides.apply(apply_replacements(&derived))
            };
            (rule.provider(), vendor_ticker)
        }
    };

    MappingRow {
        canonical_ticker: canonical.to_string(),
        alias: alias.map(str::to_string),
        provider,
        vendor_ticker: Some(vendor_ticker).filter(|t| !t.is_empty()),
    }
}
