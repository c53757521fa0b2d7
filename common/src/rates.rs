//! Rate queries and responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Currency, Result, XratesError};

/// Currency code to rate. "1 unit of base = X units of code".
pub type RateMap = BTreeMap<Currency, f64>;

/// A validated request for rates of `symbols` against `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateQuery {
    /// Base currency.
    pub base: Currency,
    /// Target currencies, in request order.
    pub symbols: Vec<Currency>,
}

impl RateQuery {
    /// Validate raw inputs and build a query.
    ///
    /// Fails on a blank base, an empty symbol list, or any blank symbol.
    pub fn new<S: AsRef<str>>(base: &str, symbols: &[S]) -> Result<Self> {
        let base = Currency::new(base);
        if base.is_blank() {
            return Err(XratesError::invalid_argument(
                "base",
                "Base currency must be provided",
            ));
        }

        if symbols.is_empty() {
            return Err(XratesError::invalid_argument(
                "symbols",
                "At least one target currency symbol must be provided",
            ));
        }

        let symbols: Vec<Currency> = symbols.iter().map(|s| Currency::new(s)).collect();
        if symbols.iter().any(Currency::is_blank) {
            return Err(XratesError::invalid_argument(
                "symbols",
                "Currency symbols cannot be null or empty",
            ));
        }

        Ok(Self { base, symbols })
    }

    /// Cache key for this query: `BASE|A,B,C`.
    ///
    /// Symbols are upper-cased, sorted and de-duplicated, so queries that
    /// differ only in symbol order or case share a key.
    pub fn cache_key(&self) -> String {
        let mut symbols: Vec<&str> = self.symbols.iter().map(Currency::code).collect();
        symbols.sort_unstable();
        symbols.dedup();
        format!("{}|{}", self.base.code(), symbols.join(","))
    }
}

impl fmt::Display for RateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self.symbols.iter().map(Currency::code).collect();
        write!(f, "{}->[{}]", self.base, symbols.join(","))
    }
}

/// Averaged rates for one query. This is what gets cached and returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    /// Base currency.
    pub base: Currency,
    /// Averaged rates per target currency.
    pub rates: RateMap,
}

impl AggregatedResponse {
    /// Create a new aggregated response.
    pub fn new(base: Currency, rates: RateMap) -> Self {
        Self { base, rates }
    }

    /// Get the rate for a currency, if any provider reported it.
    pub fn rate(&self, currency: &Currency) -> Option<f64> {
        self.rates.get(currency).copied()
    }
}

/// Outcome of asking one provider for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult {
    /// Provider name.
    pub provider: String,
    /// Reported rates, or `None` when the provider contributed nothing.
    pub rates: Option<RateMap>,
}

impl ProviderResult {
    /// A provider that returned data.
    pub fn available(provider: impl Into<String>, rates: RateMap) -> Self {
        Self {
            provider: provider.into(),
            rates: Some(rates),
        }
    }

    /// A provider that failed, timed out, or returned nothing usable.
    pub fn absent(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            rates: None,
        }
    }

    /// Check if the provider contributed nothing.
    pub fn is_absent(&self) -> bool {
        self.rates.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_query_rejects_blank_base() {
        let err = RateQuery::new("  ", &["USD"]).unwrap_err();
        assert_eq!(
            err,
            XratesError::invalid_argument("base", "Base currency must be provided")
        );
    }

    #[test]
    fn test_query_rejects_empty_symbols() {
        let symbols: [&str; 0] = [];
        let err = RateQuery::new("EUR", &symbols).unwrap_err();
        assert!(err.to_string().contains("At least one target currency"));
    }

    #[test]
    fn test_query_rejects_blank_symbol() {
        let err = RateQuery::new("EUR", &["USD", ""]).unwrap_err();
        assert_eq!(err.to_string(), "Currency symbols cannot be null or empty");
    }

    #[test]
    fn test_query_keeps_request_order() {
        let query = RateQuery::new("eur", &["usd", "nzd"]).unwrap();
        assert_eq!(query.base, Currency::eur());
        assert_eq!(query.symbols, vec![Currency::usd(), Currency::nzd()]);
        assert_eq!(query.to_string(), "EUR->[USD,NZD]");
    }

    #[test]
    fn test_cache_key_normalizes_case_and_order() {
        let a = RateQuery::new("eur", &["nzd", "usd"]).unwrap();
        let b = RateQuery::new("EUR", &["USD", "NZD"]).unwrap();
        let c = RateQuery::new("Eur", &["Usd", "nZd", "USD"]).unwrap();

        assert_eq!(a.cache_key(), "EUR|NZD,USD");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_base() {
        let a = RateQuery::new("EUR", &["USD"]).unwrap();
        let b = RateQuery::new("GBP", &["USD"]).unwrap();
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_aggregated_response_json_shape() {
        let mut rates = RateMap::new();
        rates.insert(Currency::eur(), 0.85);
        let response = AggregatedResponse::new(Currency::usd(), rates);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({ "base": "USD", "rates": { "EUR": 0.85 } }));
    }

    proptest! {
        #[test]
        fn prop_cache_key_ignores_symbol_order(
            mut symbols in proptest::collection::vec("[a-zA-Z]{3}", 1..6),
        ) {
            let forward = RateQuery::new("usd", symbols.as_slice()).unwrap().cache_key();
            symbols.reverse();
            let lowered: Vec<String> = symbols.iter().map(|s| s.to_lowercase()).collect();
            let backward = RateQuery::new("USD", lowered.as_slice()).unwrap().cache_key();
            prop_assert_eq!(forward, backward);
        }
    }
}
