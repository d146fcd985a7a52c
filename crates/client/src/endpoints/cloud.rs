//! dbt Cloud REST API (v2) endpoints.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::endpoints::request::{RequestLabels, send_request_with_retry};
use crate::error::{ClientError, Result};
use crate::metrics::{ApiSurface, MetricsCollector};
use crate::models::{
    DbtAccountInfo, DbtAccountResponse, DbtJob, DbtJobResponse, DbtJobsResponse, DbtRun,
    DbtRunsResponse,
};

/// Shared request context for REST calls.
#[derive(Debug, Clone, Copy)]
pub struct RestContext<'a> {
    pub client: &'a Client,
    pub base_url: &'a str,
    pub token: &'a SecretString,
    pub max_retries: usize,
    pub metrics: Option<&'a MetricsCollector>,
}

async fn get_json<T: DeserializeOwned>(
    ctx: RestContext<'_>,
    resource: &'static str,
    path: &str,
    query: &[(&str, String)],
) -> Result<T> {
    let url = format!("{}/{}", ctx.base_url, path);
    debug!(%url, "GET dbt Cloud REST resource");

    let builder = ctx
        .client
        .get(&url)
        .header(
            "Authorization",
            format!("Bearer {}", ctx.token.expose_secret()),
        )
        .header("Accept", "application/json")
        .query(query);

    let labels = RequestLabels {
        operation: resource,
        api: ApiSurface::Rest,
    };
    let response = send_request_with_retry(builder, ctx.max_retries, labels, ctx.metrics).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        let err = ClientError::InvalidResponse(format!("{resource}: {e}"));
        if let Some(m) = ctx.metrics {
            m.record_client_error(resource, ApiSurface::Rest, &err);
        }
        err
    })
}

/// List every job of an account.
pub async fn list_jobs(ctx: RestContext<'_>, account_id: u64) -> Result<Vec<DbtJob>> {
    let resp: DbtJobsResponse =
        get_json(ctx, "jobs", &format!("accounts/{account_id}/jobs/"), &[]).await?;
    Ok(resp.data)
}

/// Fetch one job definition.
pub async fn get_job(ctx: RestContext<'_>, account_id: u64, job_id: i64) -> Result<DbtJob> {
    let resp: DbtJobResponse = get_json(
        ctx,
        "job",
        &format!("accounts/{account_id}/jobs/{job_id}/"),
        &[],
    )
    .await?;
    Ok(resp.data)
}

/// Fetch account information.
pub async fn get_account(ctx: RestContext<'_>, account_id: u64) -> Result<DbtAccountInfo> {
    let resp: DbtAccountResponse =
        get_json(ctx, "account", &format!("accounts/{account_id}/"), &[]).await?;
    Ok(resp.data)
}

/// Most recent runs of a job, newest first.
pub async fn list_runs(
    ctx: RestContext<'_>,
    account_id: u64,
    job_id: i64,
    limit: usize,
) -> Result<Vec<DbtRun>> {
    let query = [
        ("job_definition_id", job_id.to_string()),
        ("order_by", "-id".to_string()),
        ("limit", limit.to_string()),
    ];
    let resp: DbtRunsResponse =
        get_json(ctx, "runs", &format!("accounts/{account_id}/runs/"), &query).await?;
    Ok(resp.data)
}
