//! Shared HTTP plumbing for providers.

use std::time::Duration;

use reqwest::{Client, Url};
use tracing::debug;
use xrates_common::{Result, XratesError};

/// Configuration for the providers' HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("xrates/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Build a client from this configuration.
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| XratesError::Configuration(format!("HTTP client: {e}")))
    }
}

/// Join `path` onto `base_url`, tolerating a trailing slash on the base.
pub(crate) fn endpoint(provider: &str, base_url: &str, path: &str) -> Result<Url> {
    let raw = format!("{}/{}", base_url.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| XratesError::ProviderUnavailable {
        provider: provider.to_string(),
        reason: format!("invalid URL {raw}: {e}"),
    })
}

/// GET `url` and return the body of a successful response.
pub(crate) async fn get_text(client: &Client, provider: &str, url: Url) -> Result<String> {
    debug!(provider, url = %url, "Fetching rates");

    let response = client
        .get(url)
        .header("accept", "application/json")
        .send()
        .await
        .map_err(|e| XratesError::ProviderUnavailable {
            provider: provider.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(XratesError::ProviderUnavailable {
            provider: provider.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    response
        .text()
        .await
        .map_err(|e| XratesError::ProviderUnavailable {
            provider: provider.to_string(),
            reason: format!("failed to read body: {e}"),
        })
}

/// Build a `MalformedResponse` error.
pub(crate) fn malformed(provider: &str, reason: impl Into<String>) -> XratesError {
    XratesError::MalformedResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let url = endpoint("p", "https://api.frankfurter.app/", "latest").unwrap();
        assert_eq!(url.as_str(), "https://api.frankfurter.app/latest");
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        let err = endpoint("p", "not a url", "latest").unwrap_err();
        assert!(err.is_provider_failure());
    }

    #[test]
    fn test_default_client_builds() {
        assert!(HttpClientConfig::default().build_client().is_ok());
    }
}
