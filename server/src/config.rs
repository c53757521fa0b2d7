//! Server configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use xrates_common::{Result, XratesError};
use xrates_fx::{AggregatorConfig, RateCacheConfig};
use xrates_providers::{fawaz, frankfurter, HttpClientConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable lines.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = XratesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(XratesError::Configuration(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Upper bound on one provider call inside a query.
    pub provider_timeout: Duration,
    /// Cache capacity. `None` means unbounded.
    pub cache_max_entries: Option<usize>,
    /// Cache entry lifetime in seconds. `None` means entries never expire.
    pub cache_ttl_secs: Option<u64>,
    /// Frankfurter API root.
    pub frankfurter_url: String,
    /// Fawaz currency-api root.
    pub fawaz_url: String,
    /// Whole-request timeout of the providers' HTTP client.
    pub http_timeout: Duration,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            provider_timeout: Duration::from_millis(5000),
            cache_max_entries: None,
            cache_ttl_secs: None,
            frankfurter_url: frankfurter::DEFAULT_BASE_URL.to_string(),
            fawaz_url: fawaz::DEFAULT_BASE_URL.to_string(),
            http_timeout: Duration::from_millis(10_000),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `lookup`, keeping defaults for unset or
    /// unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("XRATES_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = parse(&lookup, "XRATES_LISTEN_PORT") {
            config.listen_port = port;
        }

        if let Some(ms) = parse(&lookup, "XRATES_PROVIDER_TIMEOUT_MS") {
            config.provider_timeout = Duration::from_millis(ms);
        }

        if let Some(max_entries) = parse(&lookup, "XRATES_CACHE_MAX_ENTRIES") {
            config.cache_max_entries = Some(max_entries);
        }

        if let Some(secs) = parse(&lookup, "XRATES_CACHE_TTL_SECS") {
            config.cache_ttl_secs = Some(secs);
        }

        if let Some(url) = lookup("XRATES_FRANKFURTER_URL") {
            config.frankfurter_url = url;
        }

        if let Some(url) = lookup("XRATES_FAWAZ_URL") {
            config.fawaz_url = url;
        }

        if let Some(ms) = parse(&lookup, "XRATES_HTTP_TIMEOUT_MS") {
            config.http_timeout = Duration::from_millis(ms);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(format) = parse(&lookup, "XRATES_LOG_FORMAT") {
            config.log_format = format;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            return Err(config_error("Listen port cannot be 0"));
        }

        if self.provider_timeout.is_zero() {
            return Err(config_error("Provider timeout cannot be 0"));
        }

        if self.http_timeout.is_zero() {
            return Err(config_error("HTTP timeout cannot be 0"));
        }

        if self.cache_max_entries == Some(0) {
            return Err(config_error("Cache capacity cannot be 0"));
        }

        if self.cache_ttl_secs == Some(0) {
            return Err(config_error("Cache TTL cannot be 0"));
        }

        if self.frankfurter_url.trim().is_empty() || self.fawaz_url.trim().is_empty() {
            return Err(config_error("Provider URLs cannot be empty"));
        }

        self.socket_addr()?;
        self.cache_config()?;

        Ok(())
    }

    /// Address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.listen_addr, self.listen_port)
            .parse()
            .map_err(|e| config_error(format!("invalid listen address: {e}")))
    }

    /// Cache settings for the aggregator.
    pub fn cache_config(&self) -> Result<RateCacheConfig> {
        let mut cache = RateCacheConfig::unbounded();

        if let Some(max_entries) = self.cache_max_entries {
            cache = cache.with_max_entries(max_entries);
        }

        if let Some(secs) = self.cache_ttl_secs {
            let ttl = i64::try_from(secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .ok_or_else(|| config_error(format!("cache TTL out of range: {secs}s")))?;
            cache = cache.with_ttl(ttl);
        }

        Ok(cache)
    }

    /// Aggregator settings.
    pub fn aggregator_config(&self) -> Result<AggregatorConfig> {
        Ok(AggregatorConfig {
            cache: self.cache_config()?,
            provider_timeout: self.provider_timeout,
            ..Default::default()
        })
    }

    /// HTTP client settings for the providers.
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.http_timeout,
            ..Default::default()
        }
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}

fn config_error(message: impl Into<String>) -> XratesError {
    XratesError::Configuration(message.into())
}
