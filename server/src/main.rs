//! xrates Server Binary
//!
//! Serves averaged exchange rates from the configured providers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use xrates_fx::{duration_ms, RateAggregator};
use xrates_server::{build_state, router, LogFormat, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = ServerConfig::from_env();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    info!("Starting xrates server");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let state = build_state(&config)?;
    let addr = config.socket_addr()?;

    if let Some(ttl) = config.cache_ttl_secs {
        spawn_cache_cleanup(state.aggregator.clone(), Duration::from_secs(ttl));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        listen_addr = %addr,
        providers = ?state.aggregator.provider_names(),
        provider_timeout_ms = duration_ms(config.provider_timeout),
        cache_max_entries = ?config.cache_max_entries,
        cache_ttl_secs = ?config.cache_ttl_secs,
        "xrates server running"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("xrates server shutdown complete");
    Ok(())
}

/// Periodically drop expired cache entries.
fn spawn_cache_cleanup(aggregator: Arc<RateAggregator>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            aggregator.cleanup();
            let stats = aggregator.cache_stats();
            debug!(
                entries = stats.total_entries,
                max_entries = ?stats.max_entries,
                "Expired cache entries swept"
            );
        }
    });
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
