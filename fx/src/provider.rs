//! Rate provider trait and registry.

use async_trait::async_trait;
use std::sync::Arc;
use xrates_common::{Currency, RateMap, Result};

/// Trait for external FX rate sources.
///
/// Implementations report failures as errors; the aggregator treats every
/// error as "no data from this provider this round".
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch rates of `symbols` against `base`.
    async fn fetch_rates(&self, base: &Currency, symbols: &[Currency]) -> Result<RateMap>;
}

/// The set of providers the aggregator fans out to.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn RateProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider.
    pub fn register(&mut self, provider: Arc<dyn RateProvider>) {
        self.providers.push(provider);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, provider: Arc<dyn RateProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Iterate over registered providers.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn RateProvider>> {
        self.providers.iter()
    }

    /// Names of registered providers, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl FromIterator<Arc<dyn RateProvider>> for ProviderRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn RateProvider>>>(iter: I) -> Self {
        Self {
            providers: iter.into_iter().collect(),
        }
    }
}

/// What a [`MockRateProvider`] does when asked.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer with the configured rates.
    Rates(RateMap),
    /// Answer with an empty map.
    Empty,
    /// Fail with `ProviderUnavailable`.
    Fail,
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    behavior: parking_lot::RwLock<MockBehavior>,
    delay: Option<std::time::Duration>,
    calls: std::sync::atomic::AtomicUsize,
    received: parking_lot::Mutex<Vec<(Currency, Vec<Currency>)>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider that answers with an empty map.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: parking_lot::RwLock::new(MockBehavior::Empty),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
            received: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock answering with the given `(code, rate)` pairs.
    pub fn with_rates(name: impl Into<String>, rates: &[(&str, f64)]) -> Self {
        let provider = Self::new(name);
        provider.set_rates(rates);
        provider
    }

    /// Create a mock that always fails.
    pub fn failing(name: impl Into<String>) -> Self {
        let provider = Self::new(name);
        provider.set_behavior(MockBehavior::Fail);
        provider
    }

    /// Delay every answer by `delay`.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the configured rates.
    pub fn set_rates(&self, rates: &[(&str, f64)]) {
        let map = rates
            .iter()
            .map(|(code, rate)| (Currency::new(code), *rate))
            .collect();
        self.set_behavior(MockBehavior::Rates(map));
    }

    /// Replace the behavior.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write() = behavior;
    }

    /// Number of times `fetch_rates` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Arguments of every call, in order.
    pub fn received(&self) -> Vec<(Currency, Vec<Currency>)> {
        self.received.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self, base: &Currency, symbols: &[Currency]) -> Result<RateMap> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.received.lock().push((base.clone(), symbols.to_vec()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self.behavior.read().clone();
        match behavior {
            MockBehavior::Rates(rates) => Ok(rates),
            MockBehavior::Empty => Ok(RateMap::new()),
            MockBehavior::Fail => Err(xrates_common::XratesError::ProviderUnavailable {
                provider: self.name.clone(),
                reason: "mock failure".to_string(),
            }),
        }
    }
}
