//! Frankfurter (ECB reference rates) provider.
//!
//! `GET {base_url}/latest?from=EUR&to=USD,NZD` answers all symbols at once:
//!
//! ```json
//! { "amount": 1.0, "base": "EUR", "date": "2024-05-17", "rates": { "USD": 1.0867, "NZD": 1.7753 } }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use xrates_common::{Currency, RateMap, Result};
use xrates_fx::RateProvider;

use crate::http::{endpoint, get_text, malformed, HttpClientConfig};

/// Provider name used in metrics and logs.
pub const NAME: &str = "frankfurter";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: Option<HashMap<String, f64>>,
}

/// Frankfurter rate provider.
#[derive(Debug, Clone)]
pub struct FrankfurterProvider {
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    /// Create a provider against `base_url` using a shared client.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Create a provider against the public API with its own client.
    pub fn with_defaults() -> Result<Self> {
        let client = HttpClientConfig::default().build_client()?;
        Ok(Self::new(client, DEFAULT_BASE_URL))
    }

    /// Parse a `/latest` body into a rate map.
    pub fn parse_latest(body: &str) -> Result<RateMap> {
        let response: LatestResponse =
            serde_json::from_str(body).map_err(|e| malformed(NAME, e.to_string()))?;

        let rates = response
            .rates
            .ok_or_else(|| malformed(NAME, "missing rates object"))?;

        Ok(rates
            .into_iter()
            .map(|(code, rate)| (Currency::new(code), rate))
            .collect())
    }
}

#[async_trait]
impl RateProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self, symbols), fields(provider = NAME))]
    async fn fetch_rates(&self, base: &Currency, symbols: &[Currency]) -> Result<RateMap> {
        let to: Vec<&str> = symbols.iter().map(Currency::code).collect();

        let mut url = endpoint(NAME, &self.base_url, "latest")?;
        url.query_pairs_mut()
            .append_pair("from", base.code())
            .append_pair("to", &to.join(","));

        let body = get_text(&self.client, NAME, url).await?;
        let rates = Self::parse_latest(&body)?;

        debug!(count = rates.len(), "Parsed Frankfurter rates");
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latest() {
        let body = r#"{"amount":1.0,"base":"EUR","date":"2024-05-17","rates":{"USD":1.0867,"NZD":1.7753}}"#;

        let rates = FrankfurterProvider::parse_latest(body).unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates.get(&Currency::usd()), Some(&1.0867));
        assert_eq!(rates.get(&Currency::nzd()), Some(&1.7753));
    }

    #[test]
    fn test_parse_latest_empty_rates() {
        let body = r#"{"amount":1.0,"base":"EUR","date":"2024-05-17","rates":{}}"#;

        assert!(FrankfurterProvider::parse_latest(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_latest_missing_rates() {
        let err = FrankfurterProvider::parse_latest(r#"{"message":"not found"}"#).unwrap_err();

        assert_eq!(err.error_code(), "MALFORMED_RESPONSE");
    }

    #[test]
    fn test_parse_latest_garbage() {
        let err = FrankfurterProvider::parse_latest("<html>").unwrap_err();

        assert!(err.is_provider_failure());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_provider_failure() {
        let client = HttpClientConfig {
            timeout: std::time::Duration::from_secs(2),
            ..Default::default()
        }
        .build_client()
        .unwrap();
        let provider = FrankfurterProvider::new(client, "http://127.0.0.1:9");

        let result = provider
            .fetch_rates(&Currency::eur(), &[Currency::usd()])
            .await;

        let err = tokio_test::assert_err!(result);
        assert!(err.is_provider_failure());
    }
}
