//! Error types for the code generation service.
//!
//! Two layers of errors exist:
//!
//! - [`ProviderError`]: a failed call to an external LLM backend. These never
//!   escape the pipeline; they become a diagnostic comment in the response.
//! - [`CommandError`]: a failure to set the service up or to read local input
//!   (configuration, HTTP client construction, CSV loading).
//!
//! A [`ProviderError`] serializes as `{code, message}` for the `error` field
//! of a provider-failure response.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// A failed call to an LLM provider.
///
/// The `Display` text is the diagnostic shown to operators; prefixed with
/// `# ` it becomes the comment returned in place of code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No API key is configured. No network call was attempted.
    #[error("{provider} API key not configured")]
    NotConfigured { provider: &'static str },

    /// The request exceeded the configured timeout.
    #[error("{provider} API request timed out after {timeout_secs}s")]
    Timeout {
        provider: &'static str,
        timeout_secs: u64,
    },

    /// Connection, TLS or body transfer failure.
    #[error("{provider} API request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("{provider} API error: {status}{}", format_body(.body))]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The response envelope did not contain a completion.
    #[error("{provider} API response format error: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },
}

fn format_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(" - {}", body)
    }
}

impl ProviderError {
    /// Build a transport error from a reqwest failure, separating timeouts.
    pub fn from_reqwest(provider: &'static str, timeout_secs: u64, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout {
                provider,
                timeout_secs,
            }
        } else {
            // Gemini carries the key in the query string
            ProviderError::Transport {
                provider,
                message: error.without_url().to_string(),
            }
        }
    }

    /// Name of the provider that failed.
    pub fn provider(&self) -> &'static str {
        match self {
            Self::NotConfigured { provider }
            | Self::Timeout { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::MalformedResponse { provider, .. } => provider,
        }
    }

    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured { .. } => "PROVIDER_NOT_CONFIGURED",
            Self::Timeout { .. } => "PROVIDER_TIMEOUT",
            Self::Transport { .. } => "PROVIDER_TRANSPORT",
            Self::Status { .. } => "PROVIDER_STATUS",
            Self::MalformedResponse { .. } => "PROVIDER_MALFORMED_RESPONSE",
        }
    }

    /// Whether the failure stems from local configuration rather than the
    /// remote backend.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }
}

impl Serialize for ProviderError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProviderError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// The main error type for service setup and local input handling.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// The requested provider name is not one of the supported backends.
    #[error("Unsupported API provider: {0}")]
    UnsupportedProvider(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, CommandError>;
