//! Error types for the dbt Discovery client.

use dbt_discovery_config::ConfigError;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during dbt Discovery client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Missing or unusable client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A domain entity or filter failed validation.
    #[error("Validation failed for {entity}: {message}")]
    Validation { entity: String, message: String },

    /// A caller-supplied argument violated a precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A single-resource lookup found nothing.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// The remote API rejected an environment id.
    #[error("Environment with ID {environment_id} not found: {reason}")]
    UnknownEnvironment { environment_id: i64, reason: String },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-2xx response from either API.
    #[error("API error ({status}) at {url}: {message}")]
    ApiError {
        status: u16,
        url: String,
        message: String,
    },

    /// GraphQL error envelope in an otherwise successful response.
    #[error("GraphQL error: {}", .messages.join("; "))]
    GraphQl { messages: Vec<String> },

    /// The response did not have the structure the query asked for.
    #[error("Unexpected response shape at '{path}': expected {expected}")]
    UnexpectedShape { path: String, expected: &'static str },

    /// Invalid response format.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// Maximum retries exceeded.
    #[error("Maximum retries exceeded ({0} attempts)")]
    MaxRetriesExceeded(usize),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Build a validation error for `entity`.
    pub fn validation(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Build an unexpected-shape error for a dotted response path.
    pub fn unexpected_shape(path: impl Into<String>, expected: &'static str) -> Self {
        Self::UnexpectedShape {
            path: path.into(),
            expected,
        }
    }

    /// Check if an HTTP status code is retryable.
    ///
    /// Only 429 (Too Many Requests) is retried by the transport.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429
    }

    /// Check if this error came from the remote side (transport, HTTP status,
    /// GraphQL envelope or response shape).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_)
                | Self::ApiError { .. }
                | Self::GraphQl { .. }
                | Self::UnexpectedShape { .. }
                | Self::InvalidResponse(_)
                | Self::MaxRetriesExceeded(_)
        )
    }

    /// Check if this error is a not-found lookup result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UnknownEnvironment { .. })
    }

    /// Check if this error is a local validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidArgument(_))
    }

    /// Check if this error is a configuration failure.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Config(_))
    }
}
