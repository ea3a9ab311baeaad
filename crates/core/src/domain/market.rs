use serde::{Deserialize, Serialize};
use std::fmt;

/// Market-cap universe selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapBucket {
    Small,
    Mid,
    Large,
    All,
}

impl CapBucket {
    /// Case-insensitive; anything unrecognised (or missing) selects `All`.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("small") => CapBucket::Small,
            Some("mid") => CapBucket::Mid,
            Some("large") => CapBucket::Large,
            _ => CapBucket::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapBucket::Small => "small",
            CapBucket::Mid => "mid",
            CapBucket::Large => "large",
            CapBucket::All => "all",
        }
    }
}

impl fmt::Display for CapBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Exchange {
    #[default]
    Nse,
    Bse,
}

impl Exchange {
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("BSE") => Exchange::Bse,
            _ => Exchange::Nse,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Nse => ".NS",
            Exchange::Bse => ".BO",
        }
    }
}

/// Upper-cases and trims `symbol`, appending the exchange suffix unless one is present.
pub fn normalize_ticker(symbol: &str, exchange: Exchange) -> String {
    let s = symbol.trim().to_ascii_uppercase();
    if s.is_empty() || s.contains('.') {
        return s;
    }
    format!("{s}{}", exchange.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_parse_is_case_insensitive_with_all_fallback() {
        assert_eq!(CapBucket::parse_lenient(Some("SMALL")), CapBucket::Small);
        assert_eq!(CapBucket::parse_lenient(Some(" Mid ")), CapBucket::Mid);
        assert_eq!(CapBucket::parse_lenient(Some("large")), CapBucket::Large);
        assert_eq!(CapBucket::parse_lenient(Some("micro")), CapBucket::All);
        assert_eq!(CapBucket::parse_lenient(None), CapBucket::All);
    }

    #[test]
    fn normalizes_tickers_per_exchange() {
        assert_eq!(normalize_ticker("tcs", Exchange::Nse), "TCS.NS");
        assert_eq!(normalize_ticker("reliance", Exchange::Bse), "RELIANCE.BO");
        assert_eq!(normalize_ticker("infy.ns", Exchange::Bse), "INFY.NS");
        assert_eq!(normalize_ticker("  ", Exchange::Nse), "");
    }

    #[test]
    fn exchange_defaults_to_nse() {
        assert_eq!(Exchange::parse_lenient(None), Exchange::Nse);
        assert_eq!(Exchange::parse_lenient(Some("bse")), Exchange::Bse);
        assert_eq!(Exchange::parse_lenient(Some("NYSE")), Exchange::Nse);
    }
}
