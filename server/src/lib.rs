//! xrates HTTP Server
//!
//! Exposes the rate aggregator over HTTP:
//!
//! - `GET /exchangeRates/{base}?symbols=A,B` - averaged rates
//! - `GET /metrics` - query and per-provider counters as JSON
//! - `GET /metrics/prometheus` - the same counters in Prometheus text format

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use xrates_common::Result;
use xrates_fx::{ProviderRegistry, RateAggregator};
use xrates_providers::{FawazProvider, FrankfurterProvider};

pub use config::{LogFormat, ServerConfig};
pub use error::ApiError;
pub use routes::{router, AppState};

/// Build the production providers, sharing one HTTP client.
pub fn build_providers(config: &ServerConfig) -> Result<ProviderRegistry> {
    let client = config.http_client_config().build_client()?;

    Ok(ProviderRegistry::new()
        .with(Arc::new(FrankfurterProvider::new(
            client.clone(),
            config.frankfurter_url.clone(),
        )))
        .with(Arc::new(FawazProvider::new(client, config.fawaz_url.clone()))))
}

/// Build the aggregator behind the routes.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let providers = build_providers(config)?;
    let aggregator = RateAggregator::new(providers, config.aggregator_config()?);
    Ok(AppState::new(Arc::new(aggregator)))
}
