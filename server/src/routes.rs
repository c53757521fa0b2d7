//! HTTP routes.

use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use xrates_common::{AggregatedResponse, XratesError};
use xrates_fx::{MetricsSnapshot, RateAggregator};

use crate::error::ApiError;

/// Prometheus text exposition content type.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<RateAggregator>,
}

impl AppState {
    pub fn new(aggregator: Arc<RateAggregator>) -> Self {
        Self { aggregator }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/exchangeRates/{base}", get(exchange_rates))
        .route("/metrics", get(metrics))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /exchangeRates/{base}?symbols=A,B - Averaged rates.
///
/// `symbols` may be repeated; every occurrence is split on `,`.
async fn exchange_rates(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<AggregatedResponse>, ApiError> {
    let Path(base) = path.map_err(|e| bad_request(e.body_text()))?;
    let Query(pairs) = query.map_err(|e| bad_request(e.body_text()))?;

    // No symbols at all is an empty list, which the aggregator rejects.
    let symbols = symbols_param(&pairs);

    let response = state.aggregator.get_exchange_rates(&base, symbols.as_slice()).await?;
    Ok(Json(response))
}

/// Every `symbols` value, split on `,`, in request order.
fn symbols_param(pairs: &[(String, String)]) -> Vec<&str> {
    pairs
        .iter()
        .filter(|(key, _)| key == "symbols")
        .flat_map(|(_, value)| value.split(','))
        .collect()
}

fn bad_request(message: String) -> ApiError {
    ApiError(XratesError::InvalidArgument {
        message,
        field: None,
    })
}

/// GET /metrics - Query and per-provider counters.
async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.aggregator.metrics_snapshot())
}

/// GET /metrics/prometheus - The same counters in Prometheus text format.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.aggregator.metrics().to_prometheus(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use xrates_common::Currency;
    use xrates_fx::{AggregatorConfig, MockRateProvider, ProviderRegistry};

    struct Harness {
        app: Router,
        a: Arc<MockRateProvider>,
        b: Arc<MockRateProvider>,
    }

    fn harness() -> Harness {
        let a = Arc::new(MockRateProvider::with_rates("a", &[("USD", 1.0), ("NZD", 1.5)]));
        let b = Arc::new(MockRateProvider::with_rates("b", &[("USD", 1.2), ("NZD", 1.7)]));
        let providers = ProviderRegistry::new().with(a.clone()).with(b.clone());
        let aggregator = Arc::new(RateAggregator::new(providers, AggregatorConfig::default()));

        Harness {
            app: router(AppState::new(aggregator)),
            a,
            b,
        }
    }

    async fn send(app: &Router, uri: &str) -> (StatusCode, String, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, content_type, body.to_vec())
    }

    fn json_body(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    fn assert_close(value: &Value, expected: f64) {
        let actual = value.as_f64().expect("number");
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[tokio::test]
    async fn test_exchange_rates_averages() {
        let h = harness();

        let (status, _, body) = send(&h.app, "/exchangeRates/EUR?symbols=USD,NZD").await;

        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["base"], "EUR");
        assert_close(&body["rates"]["USD"], 1.1);
        assert_close(&body["rates"]["NZD"], 1.6);
    }

    #[tokio::test]
    async fn test_exchange_rates_normalizes_and_caches() {
        let h = harness();

        let (first, _, _) = send(&h.app, "/exchangeRates/eur?symbols=nzd,usd").await;
        let (second, _, body) = send(&h.app, "/exchangeRates/EUR?symbols=USD,NZD").await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::OK);
        assert_eq!(json_body(&body)["base"], "EUR");
        assert_eq!(h.a.calls(), 1);
        assert_eq!(h.b.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_symbols_is_bad_request() {
        let h = harness();

        let (status, _, body) = send(&h.app, "/exchangeRates/EUR").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(&body),
            json!({
                "error": "Invalid request",
                "message": "At least one target currency symbol must be provided"
            })
        );
        assert_eq!(h.a.calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_symbols_param() {
        let h = harness();

        let (status, _, body) = send(&h.app, "/exchangeRates/EUR?symbols=USD&symbols=NZD").await;

        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_close(&body["rates"]["USD"], 1.1);
        assert_close(&body["rates"]["NZD"], 1.6);
        assert_eq!(
            h.a.received(),
            vec![(Currency::eur(), vec![Currency::usd(), Currency::nzd()])]
        );
    }

    #[tokio::test]
    async fn test_repeated_and_comma_separated_symbols_share_cache_entry() {
        let h = harness();

        send(&h.app, "/exchangeRates/EUR?symbols=USD&symbols=NZD").await;
        let (status, _, _) = send(&h.app, "/exchangeRates/EUR?symbols=NZD,USD").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.a.calls(), 1);
    }

    #[test]
    fn test_symbols_param() {
        let pairs = vec![
            ("symbols".to_string(), "USD,NZD".to_string()),
            ("other".to_string(), "x".to_string()),
            ("symbols".to_string(), "GBP".to_string()),
        ];

        assert_eq!(symbols_param(&pairs), vec!["USD", "NZD", "GBP"]);
        assert!(symbols_param(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_blank_symbol_is_bad_request() {
        let h = harness();

        let (status, _, body) = send(&h.app, "/exchangeRates/EUR?symbols=USD,,NZD").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"], "Invalid request");
    }

    #[tokio::test]
    async fn test_blank_base_is_bad_request() {
        let h = harness();

        let (status, _, _) = send(&h.app, "/exchangeRates/%20?symbols=USD").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_all_providers_down_is_empty_rates() {
        let h = harness();
        h.a.set_behavior(xrates_fx::MockBehavior::Fail);
        h.b.set_behavior(xrates_fx::MockBehavior::Empty);

        let (status, _, body) = send(&h.app, "/exchangeRates/EUR?symbols=USD").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({ "base": "EUR", "rates": {} }));
    }

    #[tokio::test]
    async fn test_metrics() {
        let h = harness();
        send(&h.app, "/exchangeRates/EUR?symbols=USD").await;
        send(&h.app, "/exchangeRates/EUR?symbols=USD").await;

        let (status, _, body) = send(&h.app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_body(&body),
            json!({
                "totalQueries": 2,
                "apis": [
                    { "name": "a", "metrics": { "totalRequests": 1, "totalResponses": 1 } },
                    { "name": "b", "metrics": { "totalRequests": 1, "totalResponses": 1 } }
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_metrics_before_any_query() {
        let h = harness();

        let (_, _, body) = send(&h.app, "/metrics").await;

        assert_eq!(json_body(&body), json!({ "totalQueries": 0, "apis": [] }));
    }

    #[tokio::test]
    async fn test_prometheus_metrics() {
        let h = harness();
        send(&h.app, "/exchangeRates/EUR?symbols=USD").await;

        let (status, content_type, body) = send(&h.app, "/metrics/prometheus").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, PROMETHEUS_CONTENT_TYPE);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("xrates_queries_total 1"));
        assert!(text.contains("xrates_provider_requests_total{provider=\"a\"} 1"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let h = harness();

        let (status, _, _) = send(&h.app, "/exchangeRates").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
