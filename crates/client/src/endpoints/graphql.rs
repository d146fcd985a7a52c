//! Discovery API transport: POST a built query, return normalized data.

use std::time::Instant;

use dbt_discovery_config::constants::{QUERY_LOG_PREVIEW_CHARS, SLOW_QUERY_THRESHOLD_MS};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::endpoints::request::{RequestLabels, send_request_with_retry};
use crate::error::{ClientError, Result};
use crate::metrics::{ApiSurface, MetricsCollector};
use crate::normalize::normalize_owned;
use crate::query::BuiltQuery;

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    #[serde(default)]
    message: Option<String>,
}

fn preview(document: &str) -> String {
    document
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(QUERY_LOG_PREVIEW_CHARS)
        .collect()
}

/// Execute `query` and return the whole `data` object, normalized to snake_case.
pub async fn execute_query(
    client: &Client,
    endpoint: &str,
    token: &SecretString,
    query: &BuiltQuery,
    max_retries: usize,
    metrics: Option<&MetricsCollector>,
) -> Result<Value> {
    debug!(
        operation = query.operation_name,
        variables = %query.variables,
        "Executing Discovery query"
    );

    let body = json!({
        "query": query.document,
        "variables": query.variables,
    });

    let builder = client
        .post(endpoint)
        .header(
            "Authorization",
            format!("Bearer {}", token.expose_secret()),
        )
        .json(&body);

    let labels = RequestLabels {
        operation: query.operation_name,
        api: ApiSurface::Discovery,
    };

    let started = Instant::now();
    let response = send_request_with_retry(builder, max_retries, labels, metrics).await?;
    let envelope: GraphQlEnvelope = response.json().await?;
    let elapsed = started.elapsed();

    if elapsed.as_millis() > u128::from(SLOW_QUERY_THRESHOLD_MS) {
        warn!(
            operation = query.operation_name,
            elapsed_ms = elapsed.as_millis() as u64,
            query = %preview(&query.document),
            "Slow Discovery query"
        );
    } else {
        info!(
            operation = query.operation_name,
            elapsed_ms = elapsed.as_millis() as u64,
            "Discovery query completed"
        );
    }

    let result = unwrap_envelope(envelope);
    if let (Err(e), Some(m)) = (&result, metrics) {
        m.record_client_error(query.operation_name, ApiSurface::Discovery, e);
    }
    result
}

fn unwrap_envelope(envelope: GraphQlEnvelope) -> Result<Value> {
    if let Some(errors) = envelope.errors
        && !errors.is_empty()
    {
        let messages = errors
            .into_iter()
            .map(|e| e.message.unwrap_or_else(|| "unknown GraphQL error".to_string()))
            .collect();
        return Err(ClientError::GraphQl { messages });
    }

    match envelope.data {
        Some(data @ Value::Object(_)) => Ok(normalize_owned(data)),
        _ => Err(ClientError::unexpected_shape("data", "data object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(raw: Value) -> GraphQlEnvelope {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_errors_win_over_partial_data() {
        let err = unwrap_envelope(envelope(json!({
            "data": {"environment": null},
            "errors": [{"message": "Environment not found"}, {"path": ["x"]}]
        })))
        .unwrap_err();
        match err {
            ClientError::GraphQl { messages } => {
                assert_eq!(messages[0], "Environment not found");
                assert_eq!(messages.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_data_is_normalized() {
        let data = unwrap_envelope(envelope(json!({
            "data": {"environment": {"dbtProjectName": "jaffle"}},
            "errors": []
        })))
        .unwrap();
        assert_eq!(data["environment"]["dbt_project_name"], json!("jaffle"));
    }

    #[test]
    fn test_missing_data_is_unexpected_shape() {
        let err = unwrap_envelope(envelope(json!({}))).unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedShape { .. }));
    }

    #[test]
    fn test_preview_collapses_whitespace() {
        let text = preview("query X {\n  environment {\n    name\n  }\n}");
        assert_eq!(text, "query X { environment { name } }");
    }
}
