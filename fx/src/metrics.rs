//! Query and provider counters.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Request/response counters for one provider.
#[derive(Debug, Default)]
struct ProviderCounters {
    requests: AtomicU64,
    responses: AtomicU64,
}

/// Process-wide aggregation metrics.
///
/// Counters start at zero and only ever grow.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    total_queries: AtomicU64,
    providers: DashMap<String, ProviderCounters>,
}

impl MetricsRecorder {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one valid query.
    pub fn increment_total_queries(&self) {
        let total = self.total_queries.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(total, "Total queries incremented");
    }

    /// Count one request sent to `provider`.
    pub fn increment_request(&self, provider: &str) {
        let count = self.with_counters(provider, |c| c.requests.fetch_add(1, Ordering::Relaxed) + 1);
        debug!(provider, count, "Provider request counted");
    }

    /// Count one usable response received from `provider`.
    pub fn increment_response(&self, provider: &str) {
        let count = self.with_counters(provider, |c| c.responses.fetch_add(1, Ordering::Relaxed) + 1);
        debug!(provider, count, "Provider response counted");
    }

    /// Total valid queries so far.
    pub fn total_queries(&self) -> u64 {
        self.total_queries.load(Ordering::Relaxed)
    }

    /// Get current metrics snapshot.
    ///
    /// Only providers with at least one recorded request are listed.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut apis: Vec<ApiMetricsEntry> = self
            .providers
            .iter()
            .filter_map(|entry| {
                let requests = entry.requests.load(Ordering::Relaxed);
                if requests == 0 {
                    return None;
                }
                Some(ApiMetricsEntry {
                    name: entry.key().clone(),
                    metrics: ApiMetrics {
                        total_requests: requests,
                        total_responses: entry.responses.load(Ordering::Relaxed),
                    },
                })
            })
            .collect();
        apis.sort_by(|a, b| a.name.cmp(&b.name));

        MetricsSnapshot {
            total_queries: self.total_queries(),
            apis,
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = format!(
            r#"# HELP xrates_queries_total Total number of valid rate queries
# TYPE xrates_queries_total counter
xrates_queries_total {}

# HELP xrates_provider_requests_total Requests sent to each provider
# TYPE xrates_provider_requests_total counter
"#,
            snapshot.total_queries
        );
        for api in &snapshot.apis {
            out.push_str(&format!(
                "xrates_provider_requests_total{{provider=\"{}\"}} {}\n",
                api.name, api.metrics.total_requests
            ));
        }

        out.push_str(
            r#"
# HELP xrates_provider_responses_total Usable responses received from each provider
# TYPE xrates_provider_responses_total counter
"#,
        );
        for api in &snapshot.apis {
            out.push_str(&format!(
                "xrates_provider_responses_total{{provider=\"{}\"}} {}\n",
                api.name, api.metrics.total_responses
            ));
        }

        out
    }

    fn with_counters(&self, provider: &str, f: impl FnOnce(&ProviderCounters) -> u64) -> u64 {
        // Read lock on the common path; the entry API takes a write lock.
        if let Some(counters) = self.providers.get(provider) {
            return f(counters.value());
        }
        let counters = self.providers.entry(provider.to_string()).or_default();
        f(counters.value())
    }
}

/// Counters for one provider, as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub total_responses: u64,
}

/// One provider in a [`MetricsSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMetricsEntry {
    pub name: String,
    pub metrics: ApiMetrics,
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub apis: Vec<ApiMetricsEntry>,
}

impl MetricsSnapshot {
    /// Find a provider's counters by name.
    pub fn api(&self, name: &str) -> Option<&ApiMetrics> {
        self.apis
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.metrics)
    }
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<MetricsRecorder>;
