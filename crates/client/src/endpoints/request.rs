//! Retry helper for HTTP requests with exponential backoff.
//!
//! Requests that fail with HTTP 429 (Too Many Requests) are retried with
//! exponential backoff. Every other non-2xx response becomes
//! `ClientError::ApiError`.

use std::time::Instant;

use reqwest::{RequestBuilder, Response};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::metrics::{ApiSurface, MetricsCollector};

/// Longest error body carried into `ApiError::message`.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Labels used for logging and metrics of one request.
#[derive(Debug, Clone, Copy)]
pub struct RequestLabels<'a> {
    pub operation: &'a str,
    pub api: ApiSurface,
}

/// Sends an HTTP request with automatic retry logic for HTTP 429 responses.
///
/// - Implements exponential backoff (1s, 2s, 4s = 2^attempt)
/// - Retries at most `max_retries` times; 0 sends the request once
/// - Returns `MaxRetriesExceeded` when retries are exhausted
/// - Records request, retry, duration and error metrics when a collector is given
pub async fn send_request_with_retry(
    builder: RequestBuilder,
    max_retries: usize,
    labels: RequestLabels<'_>,
    metrics: Option<&MetricsCollector>,
) -> Result<Response> {
    let result = send_inner(builder, max_retries, labels, metrics).await;
    if let (Err(e), Some(m)) = (&result, metrics) {
        m.record_client_error(labels.operation, labels.api, e);
    }
    result
}

async fn send_inner(
    builder: RequestBuilder,
    max_retries: usize,
    labels: RequestLabels<'_>,
    metrics: Option<&MetricsCollector>,
) -> Result<Response> {
    for attempt in 0..=max_retries {
        let attempt_builder = match builder.try_clone() {
            Some(cloned) => cloned,
            None => {
                if attempt == 0 {
                    debug!("Request builder cannot be cloned, single attempt only");
                    return builder.send().await.map_err(ClientError::from);
                } else {
                    debug!("Cannot clone request builder for retry");
                    return Err(ClientError::MaxRetriesExceeded(attempt));
                }
            }
        };

        if let Some(m) = metrics {
            m.record_request(labels.operation, labels.api);
            if attempt > 0 {
                m.record_retry(labels.operation, labels.api, attempt);
            }
        }

        let started = Instant::now();
        let sent = attempt_builder.send().await;
        if let Some(m) = metrics {
            let status = sent.as_ref().ok().map(|r| r.status().as_u16());
            m.record_request_duration(labels.operation, labels.api, started.elapsed(), status);
        }

        match sent {
            Ok(response) if ClientError::is_retryable_status(response.status().as_u16()) => {
                if attempt < max_retries {
                    let backoff_secs = 2u64.pow(attempt as u32);
                    debug!(
                        operation = labels.operation,
                        attempt = attempt + 1,
                        max_retries = max_retries + 1,
                        backoff_secs = backoff_secs,
                        "Rate limited (HTTP 429), retrying with exponential backoff"
                    );

                    tokio::time::sleep(tokio::time::Duration::from_secs(backoff_secs)).await;
                } else {
                    debug!(
                        operation = labels.operation,
                        attempts = attempt + 1,
                        "Max retries exhausted for rate-limited request"
                    );
                    return Err(ClientError::MaxRetriesExceeded(max_retries + 1));
                }
            }
            Ok(response) => {
                if response.status().is_success() {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "Request succeeded after retry");
                    }
                    return Ok(response);
                }

                let status = response.status().as_u16();
                let url = response.url().to_string();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Could not read error response body".to_string());

                return Err(ClientError::ApiError {
                    status,
                    url,
                    message: error_message(&body),
                });
            }
            Err(e) => return Err(ClientError::from(e)),
        }
    }

    Err(ClientError::MaxRetriesExceeded(max_retries + 1))
}

/// Pull a readable message out of an error body.
///
/// Both APIs answer errors with JSON; the REST API nests it under
/// `status.user_message`, GraphQL under `errors[].message`.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value
            .pointer("/status/user_message")
            .and_then(|v| v.as_str())
        {
            return msg.to_string();
        }
        if let Some(errors) = value.get("errors").and_then(|v| v.as_array()) {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect();
            if !messages.is_empty() {
                return messages.join("; ");
            }
        }
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
