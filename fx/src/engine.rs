//! The rate aggregator: validate, consult the cache, fan out, average.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use xrates_common::{AggregatedResponse, ProviderResult, RateQuery, Result, XratesError};

use crate::cache::{CacheStats, RateCache, RateCacheConfig};
use crate::combine::combine_rates;
use crate::metrics::{MetricsRecorder, MetricsSnapshot, SharedMetrics};
use crate::provider::{ProviderRegistry, RateProvider};

/// Configuration for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Cache configuration.
    pub cache: RateCacheConfig,
    /// Upper bound on a single provider call.
    pub provider_timeout: Duration,
    /// Whether to use cached responses.
    pub use_cache: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache: RateCacheConfig::default(),
            provider_timeout: Duration::from_secs(5),
            use_cache: true,
        }
    }
}

/// Aggregates rates from every registered provider.
pub struct RateAggregator {
    providers: ProviderRegistry,
    cache: RateCache,
    metrics: SharedMetrics,
    config: AggregatorConfig,
}

impl RateAggregator {
    /// Create a new aggregator with its own metrics recorder.
    pub fn new(providers: ProviderRegistry, config: AggregatorConfig) -> Self {
        Self::with_metrics(providers, Arc::new(MetricsRecorder::new()), config)
    }

    /// Create a new aggregator that records into `metrics`.
    pub fn with_metrics(
        providers: ProviderRegistry,
        metrics: SharedMetrics,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            providers,
            cache: RateCache::with_config(config.cache.clone()),
            metrics,
            config,
        }
    }

    /// Get averaged rates of `symbols` against `base`.
    ///
    /// Invalid input fails with `InvalidArgument` before any counter,
    /// cache, or provider is touched. Provider failures never fail the
    /// call; they only shrink the set of averaged values.
    #[instrument(skip(self, symbols))]
    pub async fn get_exchange_rates<S: AsRef<str>>(
        &self,
        base: &str,
        symbols: &[S],
    ) -> Result<AggregatedResponse> {
        let query = match RateQuery::new(base, symbols) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "Rejected rate query");
                return Err(e);
            }
        };

        self.metrics.increment_total_queries();

        let cache_key = query.cache_key();
        if self.config.use_cache {
            if let Some(cached) = self.cache.get(&cache_key) {
                debug!(key = %cache_key, "Using cached rates");
                return Ok(cached);
            }
        }

        debug!(key = %cache_key, "Fetching rates from providers");
        let results = self.fan_out(&query).await;
        let rates = combine_rates(&results);
        let response = AggregatedResponse::new(query.base.clone(), rates);

        if self.config.use_cache {
            self.cache.insert(cache_key, response.clone());
        }

        info!(
            query = %query,
            providers = results.len(),
            answered = results.iter().filter(|r| !r.is_absent()).count(),
            rates = response.rates.len(),
            "Exchange rates calculated"
        );

        Ok(response)
    }

    /// Ask every provider concurrently and wait for all of them.
    async fn fan_out(&self, query: &RateQuery) -> Vec<ProviderResult> {
        join_all(
            self.providers
                .iter()
                .map(|provider| self.fetch_one(provider.as_ref(), query)),
        )
        .await
    }

    /// One attempt against one provider. Never fails.
    async fn fetch_one(&self, provider: &dyn RateProvider, query: &RateQuery) -> ProviderResult {
        let name = provider.name();
        self.metrics.increment_request(name);

        let fetch = provider.fetch_rates(&query.base, &query.symbols);
        match tokio::time::timeout(self.config.provider_timeout, fetch).await {
            Ok(Ok(rates)) if !rates.is_empty() => {
                self.metrics.increment_response(name);
                debug!(provider = name, count = rates.len(), "Got rates from provider");
                ProviderResult::available(name, rates)
            }
            Ok(Ok(_)) => {
                warn!(provider = name, "Provider returned no rates");
                ProviderResult::absent(name)
            }
            Ok(Err(e)) => {
                warn!(
                    provider = name,
                    error = %e,
                    code = e.error_code(),
                    "Provider failed to return rates"
                );
                ProviderResult::absent(name)
            }
            Err(_) => {
                let e = XratesError::ProviderTimeout {
                    provider: name.to_string(),
                    timeout_ms: duration_ms(self.config.provider_timeout),
                };
                warn!(provider = name, error = %e, code = e.error_code(), "Provider timed out");
                ProviderResult::absent(name)
            }
        }
    }

    /// Current metrics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Shared metrics recorder.
    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    /// Names of registered providers.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.names()
    }

    /// Number of cached responses.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop expired cache entries.
    pub fn cleanup(&self) {
        self.cache.evict_expired();
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
