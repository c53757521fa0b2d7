//! Fawaz Ahmed's currency-api provider.
//!
//! `GET {base_url}/currencies/eur.json` returns every rate for one base,
//! keyed by lower-case code under the lower-case base:
//!
//! ```json
//! { "date": "2024-05-17", "eur": { "usd": 1.0867, "nzd": 1.7753, "btc": 0.0000164 } }
//! ```
//!
//! Each requested symbol is looked up individually; codes the document
//! does not carry are left out.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};
use xrates_common::{Currency, RateMap, Result};
use xrates_fx::RateProvider;

use crate::http::{endpoint, get_text, malformed, HttpClientConfig};

/// Provider name used in metrics and logs.
pub const NAME: &str = "fawaz";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1";

/// Fawaz currency-api rate provider.
#[derive(Debug, Clone)]
pub struct FawazProvider {
    client: Client,
    base_url: String,
}

impl FawazProvider {
    /// Create a provider against `base_url` using a shared client.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Create a provider against the public CDN with its own client.
    pub fn with_defaults() -> Result<Self> {
        let client = HttpClientConfig::default().build_client()?;
        Ok(Self::new(client, DEFAULT_BASE_URL))
    }

    /// Pick `symbols` out of a per-base document.
    pub fn extract_rates(body: &str, base: &Currency, symbols: &[Currency]) -> Result<RateMap> {
        let document: Value =
            serde_json::from_str(body).map_err(|e| malformed(NAME, e.to_string()))?;

        let table = document
            .get(base.lower())
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(NAME, format!("missing {} rates", base.lower())))?;

        let mut rates = RateMap::new();
        for symbol in symbols {
            match table.get(&symbol.lower()).and_then(Value::as_f64) {
                Some(rate) => {
                    rates.insert(symbol.clone(), rate);
                }
                None => debug!(symbol = %symbol, "Symbol not in Fawaz document"),
            }
        }

        Ok(rates)
    }
}

#[async_trait]
impl RateProvider for FawazProvider {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self, symbols), fields(provider = NAME))]
    async fn fetch_rates(&self, base: &Currency, symbols: &[Currency]) -> Result<RateMap> {
        let path = format!("currencies/{}.json", base.lower());
        let url = endpoint(NAME, &self.base_url, &path)?;

        let body = get_text(&self.client, NAME, url).await?;
        let rates = Self::extract_rates(&body, base, symbols)?;

        debug!(count = rates.len(), "Parsed Fawaz rates");
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str =
        r#"{"date":"2024-05-17","eur":{"usd":1.0867,"nzd":1.7753,"btc":0.0000164,"1inch":2.41}}"#;

    #[test]
    fn test_extract_requested_symbols() {
        let rates =
            FawazProvider::extract_rates(BODY, &Currency::eur(), &[Currency::usd(), Currency::nzd()])
                .unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates.get(&Currency::usd()), Some(&1.0867));
        assert_eq!(rates.get(&Currency::nzd()), Some(&1.7753));
    }

    #[test]
    fn test_unknown_symbols_are_skipped() {
        let rates =
            FawazProvider::extract_rates(BODY, &Currency::eur(), &[Currency::new("XYZ")]).unwrap();

        assert!(rates.is_empty());
    }

    #[test]
    fn test_missing_base_object() {
        let err =
            FawazProvider::extract_rates(BODY, &Currency::gbp(), &[Currency::usd()]).unwrap_err();

        assert_eq!(err.error_code(), "MALFORMED_RESPONSE");
        assert!(err.to_string().contains("missing gbp rates"));
    }

    #[test]
    fn test_non_numeric_rate_is_skipped() {
        let body = r#"{"date":"2024-05-17","eur":{"usd":"n/a","nzd":1.7753}}"#;

        let rates =
            FawazProvider::extract_rates(body, &Currency::eur(), &[Currency::usd(), Currency::nzd()])
                .unwrap();

        assert_eq!(rates.len(), 1);
        assert!(rates.contains_key(&Currency::nzd()));
    }

    #[test]
    fn test_garbage_body() {
        let err = FawazProvider::extract_rates("", &Currency::eur(), &[Currency::usd()]).unwrap_err();

        assert!(err.is_provider_failure());
    }
}
