//! Metrics collection for dbt Cloud API calls.
//!
//! This module provides metrics collection for Discovery and REST calls, including:
//! - Request latency histograms
//! - Request counters (total, retries, errors)
//! - Error categorization
//!
//! # What this module does NOT handle:
//! - Metrics exposition/export (install a recorder in the embedding application)
//! - Persistent storage of metrics
//!
//! # Invariants
//! - All metrics use consistent label names: `operation`, `api`, `status`, `error_category`
//! - Metric recording is infallible and never disrupts API calls
//! - Zero-cost when no metrics recorder is installed

use crate::error::ClientError;
use std::time::Duration;

/// Metric name for request duration histogram.
pub const METRIC_REQUEST_DURATION: &str = "dbt_discovery_request_duration_seconds";

/// Metric name for total request counter.
pub const METRIC_REQUESTS_TOTAL: &str = "dbt_discovery_requests_total";

/// Metric name for retry counter.
pub const METRIC_RETRIES_TOTAL: &str = "dbt_discovery_retries_total";

/// Metric name for error counter.
pub const METRIC_ERRORS_TOTAL: &str = "dbt_discovery_errors_total";

/// Which dbt Cloud surface a request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSurface {
    Discovery,
    Rest,
}

impl ApiSurface {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ApiSurface::Discovery => "discovery",
            ApiSurface::Rest => "rest",
        }
    }
}

/// Error categories for metrics labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport-level errors (connection refused, DNS, etc.)
    Transport,
    /// HTTP 4xx client errors
    Http4xx,
    /// HTTP 5xx server errors
    Http5xx,
    /// GraphQL error envelope
    GraphQl,
    /// Response did not match the expected shape or types
    Decode,
    /// Request timeout
    Timeout,
    /// Rate limited past the retry budget
    RateLimited,
    /// Unknown/unclassified errors
    Unknown,
}

impl ErrorCategory {
    /// Returns the string label for this error category.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Http4xx => "http_4xx",
            ErrorCategory::Http5xx => "http_5xx",
            ErrorCategory::GraphQl => "graphql",
            ErrorCategory::Decode => "decode",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl From<&ClientError> for ErrorCategory {
    /// Categorize a ClientError for metrics purposes.
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::ApiError { status, .. } => {
                if (400..500).contains(status) {
                    ErrorCategory::Http4xx
                } else if (500..600).contains(status) {
                    ErrorCategory::Http5xx
                } else {
                    ErrorCategory::Unknown
                }
            }
            ClientError::HttpError(e) if e.is_timeout() => ErrorCategory::Timeout,
            ClientError::HttpError(e) if e.is_connect() || e.is_request() => {
                ErrorCategory::Transport
            }
            ClientError::HttpError(e) if e.is_decode() => ErrorCategory::Decode,
            ClientError::GraphQl { .. } => ErrorCategory::GraphQl,
            ClientError::UnexpectedShape { .. }
            | ClientError::InvalidResponse(_)
            | ClientError::Validation { .. } => ErrorCategory::Decode,
            ClientError::MaxRetriesExceeded(_) => ErrorCategory::RateLimited,
            _ => ErrorCategory::Unknown,
        }
    }
}

/// Metrics collector for dbt Cloud API calls.
///
/// A lightweight wrapper around the `metrics` crate macros with consistent labels.
///
/// # Example
///
/// ```rust,ignore
/// use dbt_discovery_client::metrics::{ApiSurface, MetricsCollector};
///
/// let collector = MetricsCollector::new();
/// collector.record_request_duration("AppliedModels", ApiSurface::Discovery, Duration::from_millis(150), Some(200));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    /// Whether metrics collection is enabled.
    enabled: bool,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    ///
    /// The collector is enabled by default. Use [`Self::disabled()`] to create
    /// a collector that does not record any metrics.
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Create a disabled metrics collector.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Check if metrics collection is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the duration of an API request.
    ///
    /// # Arguments
    /// * `operation` - GraphQL operation name or REST resource (e.g. "AppliedModels", "jobs")
    /// * `api` - Which surface handled the request
    /// * `duration` - The request duration
    /// * `status` - The HTTP status code, or None if the request failed before receiving a response
    pub fn record_request_duration(
        &self,
        operation: &str,
        api: ApiSurface,
        duration: Duration,
        status: Option<u16>,
    ) {
        if !self.enabled {
            return;
        }

        let status_label = status.map_or("error".to_string(), |s| s.to_string());

        metrics::histogram!(METRIC_REQUEST_DURATION,
            "operation" => operation.to_string(),
            "api" => api.as_str(),
            "status" => status_label,
        )
        .record(duration.as_secs_f64());
    }

    /// Record a request attempt, including retries.
    pub fn record_request(&self, operation: &str, api: ApiSurface) {
        if !self.enabled {
            return;
        }

        metrics::counter!(METRIC_REQUESTS_TOTAL,
            "operation" => operation.to_string(),
            "api" => api.as_str(),
        )
        .increment(1);
    }

    /// Record a retry attempt (not the initial request).
    pub fn record_retry(&self, operation: &str, api: ApiSurface, attempt: usize) {
        if !self.enabled {
            return;
        }

        metrics::counter!(METRIC_RETRIES_TOTAL,
            "operation" => operation.to_string(),
            "api" => api.as_str(),
            "attempt" => attempt.to_string(),
        )
        .increment(1);
    }

    /// Record an error.
    pub fn record_error(&self, operation: &str, api: ApiSurface, category: ErrorCategory) {
        if !self.enabled {
            return;
        }

        metrics::counter!(METRIC_ERRORS_TOTAL,
            "operation" => operation.to_string(),
            "api" => api.as_str(),
            "error_category" => category.as_str(),
        )
        .increment(1);
    }

    /// Record an error from a ClientError, categorizing it automatically.
    pub fn record_client_error(&self, operation: &str, api: ApiSurface, error: &ClientError) {
        self.record_error(operation, api, ErrorCategory::from(error));
    }
}
