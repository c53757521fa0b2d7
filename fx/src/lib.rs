//! xrates FX Aggregation Engine
//!
//! Fans a rate query out to every registered provider, averages the answers
//! per currency, and caches the result per normalized query.
//!
//! # Features
//!
//! - Any number of rate providers behind one async trait
//! - Concurrent fan-out with a per-provider timeout
//! - Response caching, unbounded by default, with optional capacity and TTL
//! - Query and per-provider request/response counters
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xrates_fx::{AggregatorConfig, ProviderRegistry, RateAggregator};
//!
//! let providers = ProviderRegistry::new().with(Arc::new(my_provider));
//! let aggregator = RateAggregator::new(providers, AggregatorConfig::default());
//!
//! let response = aggregator.get_exchange_rates("EUR", &["USD", "NZD"]).await?;
//! println!("{:?}", response.rates);
//! ```

pub mod engine;
pub mod provider;
pub mod cache;
pub mod combine;
pub mod metrics;

pub use engine::{duration_ms, AggregatorConfig, RateAggregator};
pub use provider::{ProviderRegistry, RateProvider};
pub use cache::{CacheStats, RateCache, RateCacheConfig};
pub use combine::combine_rates;
pub use metrics::{MetricsRecorder, MetricsSnapshot, SharedMetrics};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::{MockBehavior, MockRateProvider};
