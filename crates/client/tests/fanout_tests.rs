//! Cross-project fan-out, job and run facade tests.
//!
//! This module tests the aggregation operations of `DiscoveryApi` and the
//! `Job` and `Run` facades built on the REST API:
//! - Partial results when one project or job fails
//! - Project filters (include/exclude by environment, name search)
//! - Job caching, runs, runtimes and rankings
//!
//! # Invariants
//! - A fan-out never fails as a whole; failing sub-fetches are reported in
//!   `failures` and left out of `items`
//! - Successful items keep project-map order
//!
//! # What this does NOT handle
//! - Single-project model caching (see project_tests.rs)

mod common;

use common::*;
use dbt_discovery_client::{MetricsCollector, ProjectFilter, SearchFilter};
use dbt_discovery_config::ConfigLoader;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};

const MARKETING_ENV: i64 = 300001;
const BROKEN_ENV: i64 = 777;

async fn mount_environments(server: &MockServer) {
    for env in [ENV_ID, MARKETING_ENV] {
        graphql("EnvironmentMetadata")
            .and(body_partial_json(json!({ "variables": { "environmentId": env } })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(load_fixture("discovery/environment_metadata.json")),
            )
            .mount(server)
            .await;
    }
    graphql("EnvironmentMetadata")
        .and(body_partial_json(json!({ "variables": { "environmentId": BROKEN_ENV } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(load_fixture("discovery/environment_not_found.json")),
        )
        .mount(server)
        .await;
}

async fn mount_jobs(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT_ID}/jobs/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("cloud/jobs.json")))
        .mount(server)
        .await;
}

/// Job 411 has two runs, job 412 fails, job 530 never ran.
async fn mount_runs(server: &MockServer) {
    let runs_path = format!("/api/v2/accounts/{ACCOUNT_ID}/runs/");
    Mock::given(method("GET"))
        .and(path(runs_path.as_str()))
        .and(query_param("job_definition_id", "411"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("cloud/runs.json")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(runs_path.as_str()))
        .and(query_param("job_definition_id", "412"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(runs_path.as_str()))
        .and(query_param("job_definition_id", "530"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(server)
        .await;
}

fn three_projects(server: &MockServer) -> DiscoveryApi {
    api(
        server,
        &[
            ("broken", BROKEN_ENV),
            ("jaffle", ENV_ID),
            ("marketing", MARKETING_ENV),
        ],
    )
}

#[tokio::test]
async fn test_get_projects_reports_rejected_environment() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;

    let projects = three_projects(&mock_server).get_projects(None).await;

    let names: Vec<_> = projects.items.iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, vec!["jaffle", "marketing"]);
    assert!(!projects.is_complete());
    assert_eq!(projects.failed_count(), 1);
    assert_eq!(projects.failures[0].resource, "broken");
    assert!(projects.failures[0].error.contains("777"));
}

#[tokio::test]
async fn test_project_filter_selects_environments() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    let api = three_projects(&mock_server).with_concurrency(1);
    let names: Vec<_> = api.project_names().collect();
    assert_eq!(names, vec!["broken", "jaffle", "marketing"]);
    assert_eq!(api.project_map()["marketing"].prod_env_id, MARKETING_ENV);

    let only_jaffle = api.get_projects(Some(&ProjectFilter::include([ENV_ID]))).await;
    assert_eq!(only_jaffle.items.len(), 1);
    assert!(only_jaffle.is_complete());

    let without_broken = api
        .get_projects(Some(&ProjectFilter::exclude([BROKEN_ENV])))
        .await;
    assert_eq!(without_broken.items.len(), 2);
    assert!(without_broken.is_complete());

    let searched = api
        .get_projects(Some(&ProjectFilter::default().with_search("MARK")))
        .await;
    let names: Vec<_> = searched.items.iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, vec!["marketing"]);
}

#[tokio::test]
async fn test_get_models_across_projects() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    mount_applied_models(&mock_server).await;

    let finance = SearchFilter::new().with_tag("finance");
    let models = three_projects(&mock_server)
        .get_models(None, Some(&finance))
        .await;

    assert_eq!(models.items.len(), 2);
    assert!(models.items.iter().all(|m| m.name() == "rev_model"));
    assert_eq!(models.items[0].project_name(), "jaffle");
    assert_eq!(models.failed_count(), 1);
}

#[tokio::test]
async fn test_get_jobs_groups_by_environment() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT_ID}/jobs/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("cloud/jobs.json")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let api = three_projects(&mock_server);
    let jobs = api
        .get_jobs(Some(&ProjectFilter::exclude([BROKEN_ENV])))
        .await;

    let ids: Vec<_> = jobs.items.iter().map(|j| j.job_id()).collect();
    assert_eq!(ids, vec![411, 412, 530]);
    assert!(jobs.is_complete());
}

#[tokio::test]
async fn test_project_jobs_cached() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT_ID}/jobs/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("cloud/jobs.json")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut project = three_projects(&mock_server).project(ENV_ID).await.unwrap();
    assert_eq!(project.job_count().await.unwrap(), 2);
    let jobs = project.get_jobs(false).await.unwrap();
    assert!(jobs.iter().all(|j| j.environment_id() == ENV_ID));
}

#[tokio::test]
async fn test_get_runs_partial_failure() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    mount_jobs(&mock_server).await;
    mount_runs(&mock_server).await;

    let runs = three_projects(&mock_server).get_runs(None, 5).await;

    let ids: Vec<_> = runs.items.iter().map(|r| r.run_id()).collect();
    assert_eq!(ids, vec![70403103, 70300000]);
    let resources: Vec<_> = runs.failures.iter().map(|f| f.resource.as_str()).collect();
    assert_eq!(resources, vec!["broken", "job 412"]);
}

#[tokio::test]
async fn test_longest_running_jobs() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    mount_jobs(&mock_server).await;
    mount_runs(&mock_server).await;

    let ranked = three_projects(&mock_server)
        .longest_running_jobs(3, 1, None, None)
        .await;

    assert_eq!(ranked.items.len(), 1);
    assert_eq!(ranked.items[0].job.job_id(), 411);
    assert_eq!(ranked.items[0].runtime, 630.0);
    assert_eq!(ranked.failed_count(), 2);
}

#[tokio::test]
async fn test_longest_running_jobs_average_over_runs() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    mount_jobs(&mock_server).await;
    mount_runs(&mock_server).await;

    let api = three_projects(&mock_server);
    let mut project = api.project(ENV_ID).await.unwrap();
    let ranked = project.longest_running_jobs(5, 2, None, 2).await.unwrap();

    // mean of 630 and 510 seconds
    assert_eq!(ranked.items[0].runtime, 570.0);
    assert_eq!(ranked.failures[0].resource, "job 412");
}

#[tokio::test]
async fn test_run_models_and_averages() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    mount_jobs(&mock_server).await;
    mount_runs(&mock_server).await;
    graphql("JobModels")
        .and(body_partial_json(json!({ "variables": { "jobId": 411, "runId": 70403103 } })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("discovery/job_models.json")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = three_projects(&mock_server);
    let mut project = api.project(ENV_ID).await.unwrap();
    let jobs = project.get_jobs(false).await.unwrap();
    let nightly = jobs.iter().find(|j| j.job_id() == 411).unwrap();
    let run = nightly.last_run().await.unwrap().unwrap();

    assert_eq!(run.run_id(), 70403103);
    assert_eq!(run.model_count().await.unwrap(), 3);

    let slowest = run.get_slowest_models(2, None).await.unwrap();
    let names: Vec<_> = slowest.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["orders_snapshot", "rev_model"]);

    let daily = SearchFilter::new().with_tag("daily");
    let average = run.average_model_runtime(5, Some(&daily), None).await.unwrap();
    assert_eq!(average, (12.0 + 1.5) / 2.0);

    let none = SearchFilter::new().with_tag("nonexistent");
    assert_eq!(run.average_model_runtime(5, Some(&none), None).await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_job_runtimes_by_run() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;
    mount_jobs(&mock_server).await;
    mount_runs(&mock_server).await;

    let api = three_projects(&mock_server);
    let mut project = api.project(ENV_ID).await.unwrap();
    let jobs = project.get_jobs(false).await.unwrap();
    let nightly = jobs.iter().find(|j| j.job_id() == 411).unwrap();

    let reports = nightly.get_runtimes(2, false).await.unwrap();
    let runtimes: Vec<_> = reports.items.iter().map(|r| r.runtime).collect();
    assert_eq!(runtimes, vec![630.0, 510.0]);
    assert!(reports.items.iter().all(|r| r.model_id.is_none()));

    assert_eq!(
        nightly.get_average_job_runtime(2, None).await.unwrap(),
        Some(570.0)
    );
}

#[tokio::test]
async fn test_missing_account_id_is_configuration_error() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;

    let api = DiscoveryApi::from_parts(
        discovery_client(&mock_server),
        cloud_client(&mock_server),
        None,
        Default::default(),
    );
    let mut project = api.project(ENV_ID).await.unwrap();

    let err = project.get_jobs(false).await.unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_api_from_config() {
    let mock_server = MockServer::start().await;
    mount_environments(&mock_server).await;

    let config = ConfigLoader::new()
        .with_service_token(TEST_TOKEN.to_string())
        .with_discovery_endpoint(format!("{}/graphql", mock_server.uri()))
        .with_cloud_base_url(format!("{}/api/v2", mock_server.uri()))
        .with_project("marketing", MARKETING_ENV)
        .without_project_file()
        .build()
        .unwrap();

    let api = DiscoveryApi::with_metrics(&config, MetricsCollector::new()).unwrap();
    let project = api.named_project("marketing").await.unwrap();
    assert_eq!(project.environment_id().get(), MARKETING_ENV);
}
