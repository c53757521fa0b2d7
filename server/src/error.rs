//! Mapping of aggregator errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};
use xrates_common::XratesError;

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub struct ApiError(pub XratesError);

impl From<XratesError> for ApiError {
    fn from(e: XratesError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = if self.0.is_client_error() {
            warn!(error = %self.0, "Invalid request");
            (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Invalid request",
                    message: Some(self.0.to_string()),
                },
            )
        } else {
            error!(error = %self.0, code = self.0.error_code(), "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal server error",
                    message: None,
                },
            )
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let bad = ApiError(XratesError::invalid_argument("base", "Base currency must be provided"));
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        let internal = ApiError(XratesError::Internal("boom".to_string()));
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
