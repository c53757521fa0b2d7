//! Error types for xrates.

use thiserror::Error;

/// Main error type for xrates operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum XratesError {
    /// Missing or malformed request argument.
    #[error("{message}")]
    InvalidArgument {
        message: String,
        field: Option<String>,
    },

    /// A provider could not be reached or answered with an error status.
    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// A provider answered, but the payload was unusable.
    #[error("Malformed response from {provider}: {reason}")]
    MalformedResponse { provider: String, reason: String },

    /// A provider did not answer within the configured bound.
    #[error("Provider {provider} timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl XratesError {
    /// Create an invalid-argument error for the given field.
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        XratesError::InvalidArgument {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Check if the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, XratesError::InvalidArgument { .. })
    }

    /// Check if this error describes a single provider failing.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            XratesError::ProviderUnavailable { .. }
                | XratesError::MalformedResponse { .. }
                | XratesError::ProviderTimeout { .. }
        )
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            XratesError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            XratesError::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            XratesError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            XratesError::ProviderTimeout { .. } => "PROVIDER_TIMEOUT",
            XratesError::Configuration(_) => "CONFIGURATION_ERROR",
            XratesError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias for xrates operations.
pub type Result<T> = std::result::Result<T, XratesError>;
