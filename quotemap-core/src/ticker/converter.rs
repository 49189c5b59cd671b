//! Exchange converter table.
//!
//! Every canonical ticker ends in a two-letter exchange code (`"VOD LN"`,
//! `"700 HK"`). The code selects a [`ConverterRule`] describing which provider
//! serves that venue and how the provider's ticker is spelled. The table is
//! compiled in and never changes at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote provider a mapped ticker is fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// eodhistoricaldata.com JSON API.
    Eodhd,
    /// Yahoo Finance CSV download (the alternate vendor).
    Yahoo,
    /// Not fetched.
    Ignore,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Eodhd => "eodhd",
            Provider::Yahoo => "yahoo",
            Provider::Ignore => "ignore",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where the symbol part of an EODHD ticker comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerSource {
    /// Text before the exchange code of the canonical ticker.
    FromCanonical,
    /// Text before the last `.` of the alias; canonical symbol when unaliased.
    FromAlias,
    /// Canonical symbol left-padded with zeros to four characters.
    FromCanonicalPadded,
}

/// Where the exchange suffix of an EODHD ticker comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixSource {
    /// The rule's literal suffix.
    Fixed,
    /// `.` plus the text after the last `.` of the alias; literal when unaliased.
    FromAlias,
}

/// How a canonical ticker on one exchange becomes a provider ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterRule {
    /// Exchange is not covered by any provider.
    Ignore,
    /// Exchange is served by the alternate vendor; the alias is used verbatim.
    AltVendor,
    /// Exchange is served by EODHD; the ticker is `prefix + suffix`.
    Eodhd {
        ticker_source: TickerSource,
        suffix_source: SuffixSource,
        suffix: &'static str,
    },
}

impl ConverterRule {
    const fn eodhd(suffix: &'static str) -> Self {
        ConverterRule::Eodhd {
            ticker_source: TickerSource::FromCanonical,
            suffix_source: SuffixSource::Fixed,
            suffix,
        }
    }

    const fn eodhd_with(
        ticker_source: TickerSource,
        suffix_source: SuffixSource,
        suffix: &'static str,
    ) -> Self {
        ConverterRule::Eodhd {
            ticker_source,
            suffix_source,
            suffix,
        }
    }

    /// Provider that tickers matching this rule are fetched from.
    pub fn provider(&self) -> Provider {
        match self {
            ConverterRule::Ignore => Provider::Ignore,
            ConverterRule::AltVendor => Provider::Yahoo,
            ConverterRule::Eodhd { .. } => Provider::Eodhd,
        }
    }
}

/// Every exchange code with a rule, in table order.
pub const EXCHANGE_CODES: &[&str] = &[
    "AU", "AV", "BB", "BZ", "CA", "CH", "CN", "CP", "DC", "FH", "FP", "GA", "GR", "GY", "HB",
    "HK", "ID", "IJ", "IM", "IT", "JP", "JX", "KS", "LN", "MF", "MK", "NA", "NO", "NZ", "PL",
    "PM", "PW", "SJ", "SM", "SP", "SS", "SW", "TB", "TI", "TT", "TW", "UQ", "US",
];

/// Look up the converter rule for an exchange code.
pub fn rule_for(exchange: &str) -> Option<ConverterRule> {
    use ConverterRule as R;
    use SuffixSource as S;
    use TickerSource as T;

    let rule = match exchange {
        "AU" => R::eodhd(".AU"),
        "AV" => R::eodhd(".VI"),
        "BB" => R::eodhd(".BR"),
        "BZ" => R::eodhd(".SA"),
        "CA" => R::Ignore,
        "CH" => R::Ignore,
        "CN" => R::eodhd(".TO"),
        "CP" => R::AltVendor,
        "DC" => R::eodhd(".CO"),
        "FH" => R::eodhd(".HE"),
        "FP" => R::eodhd(".PA"),
        "GA" => R::eodhd(".AT"),
        "GR" => R::eodhd(".XETRA"),
        "GY" => R::Ignore,
        "HB" => R::eodhd(".BUD"),
        "HK" => R::eodhd_with(T::FromCanonicalPadded, S::Fixed, ".HK"),
        "ID" => R::eodhd_with(T::FromAlias, S::Fixed, ".IR"),
        "IJ" => R::eodhd(".JK"),
        "IM" => R::eodhd(".MI"),
        "IT" => R::eodhd(".TA"),
        "JP" => R::AltVendor,
        "JX" => R::Ignore,
        "KS" => R::eodhd(".KQ"),
        "LN" => R::eodhd(".LSE"),
        "MF" => R::eodhd(".MX"),
        "MK" => R::eodhd_with(T::FromAlias, S::Fixed, ".KLSE"),
        "NA" => R::eodhd(".AS"),
        "NO" => R::eodhd(".OL"),
        "NZ" => R::AltVendor,
        "PL" => R::eodhd(".LS"),
        "PM" => R::eodhd(".PSE"),
        "PW" => R::eodhd(".WAR"),
        "SJ" => R::eodhd(".JSE"),
        "SM" => R::eodhd(".MC"),
        "SP" => R::eodhd_with(T::FromAlias, S::Fixed, ".SG"),
        "SS" => R::eodhd_with(T::FromAlias, S::Fixed, ".ST"),
        "SW" => R::eodhd(".SW"),
        "TB" => R::eodhd(".BK"),
        "TI" => R::eodhd(".IS"),
        "TT" => R::eodhd_with(T::FromCanonical, S::FromAlias, ".TW"),
        "TW" => R::Ignore,
        "UQ" => R::Ignore,
        "US" => R::eodhd(".US"),
        _ => return None,
    };
    Some(rule)
}

/// Split at the last occurrence of `sep`.
///
/// Returns `("", s)` when `sep` does not occur, so the tail is always the
/// whole string for separator-free input.
pub(crate) fn split_last(s: &str, sep: char) -> (&str, &str) {
    s.rsplit_once(sep).unwrap_or(("", s))
}

/// Exchange code of a canonical ticker: the token after the last space.
pub fn exchange_code(canonical: &str) -> &str {
    split_last(canonical, ' ').1
}

/// Symbol part of a canonical ticker: everything before the last space.
pub fn symbol_part(canonical: &str) -> &str {
    split_last(canonical, ' ').0
}
