//! Discovery (GraphQL) client tests.
//!
//! This module tests the typed service methods of `DiscoveryClient` against a
//! mock GraphQL endpoint, including:
//! - Environment metadata and state summaries
//! - Cursor pagination of applied models
//! - Historical runs and batched lookups
//! - Cursor pagination of model definitions
//! - Job-scoped model and test queries
//! - GraphQL error envelopes and HTTP failures
//!
//! # Invariants
//! - Every request carries `Authorization: Bearer <token>`
//! - Errors in the envelope win over partial data
//!
//! # What this does NOT handle
//! - Facade caching (see project_tests.rs)
//! - REST endpoints (see cloud_tests.rs)

mod common;

use common::*;
use dbt_discovery_client::query::{AppliedModelFilter, DefinitionFilter, DefinitionModelsRequest};
use dbt_discovery_client::testing::{applied_models_page, generators::AppliedModelGenerator};
use dbt_discovery_client::{ClientError, EnvironmentId, FieldSelection, JobId, RunId, RunOutcome};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};

fn env() -> EnvironmentId {
    EnvironmentId::new(ENV_ID).unwrap()
}

#[tokio::test]
async fn test_environment_metadata() {
    let mock_server = MockServer::start().await;

    graphql("EnvironmentMetadata")
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .and(body_partial_json(json!({ "variables": { "environmentId": ENV_ID } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(load_fixture("discovery/environment_metadata.json")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = discovery_client(&mock_server);
    let meta = client.environment_metadata(env()).await.unwrap();

    assert_eq!(meta.name, "jaffle_shop");
    assert_eq!(meta.adapter_type.as_deref(), Some("snowflake"));
    assert_eq!(meta.environment_id, ENV_ID);
    assert!(meta.updated_at.is_some());
}

#[tokio::test]
async fn test_null_environment_is_not_found() {
    let mock_server = MockServer::start().await;
    mount_graphql(
        &mock_server,
        "EnvironmentMetadata",
        json!({ "data": { "environment": null } }),
    )
    .await;

    let err = discovery_client(&mock_server)
        .environment_metadata(env())
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_graphql_errors_are_reported() {
    let mock_server = MockServer::start().await;
    mount_graphql(
        &mock_server,
        "EnvironmentMetadata",
        load_fixture("discovery/environment_not_found.json"),
    )
    .await;

    let err = discovery_client(&mock_server)
        .environment_metadata(env())
        .await
        .unwrap_err();

    match err {
        ClientError::GraphQl { messages } => {
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("not found"));
        }
        other => panic!("Expected GraphQl error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_errors_win_over_partial_data() {
    let mock_server = MockServer::start().await;
    mount_graphql(
        &mock_server,
        "EnvironmentMetadata",
        json!({
            "data": { "environment": { "dbtProjectName": "jaffle_shop" } },
            "errors": [{ "message": "partial failure" }]
        }),
    )
    .await;

    let err = discovery_client(&mock_server)
        .environment_metadata(env())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::GraphQl { .. }));
    assert!(err.is_remote());
}

#[tokio::test]
async fn test_http_error_is_api_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&mock_server)
        .await;

    let err = discovery_client(&mock_server)
        .environment_metadata(env())
        .await
        .unwrap_err();

    match err {
        ClientError::ApiError {
            status, message, ..
        } => {
            assert_eq!(status, 401);
            assert!(message.contains("invalid token"));
        }
        other => panic!("Expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    init_tracing();
    let mock_server = MockServer::start().await;
    graphql("EnvironmentMetadata")
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_environment(&mock_server).await;

    let metadata = discovery_client(&mock_server)
        .environment_metadata(env())
        .await
        .unwrap();
    assert_eq!(metadata.name, "jaffle_shop");
}

#[tokio::test]
async fn test_rate_limit_exhausts_retries() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&mock_server)
        .await;

    let err = discovery_client(&mock_server)
        .environment_metadata(env())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MaxRetriesExceeded(2)), "{err:?}");
}

#[tokio::test]
async fn test_zero_retries_sends_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = DiscoveryClient::builder()
        .endpoint(format!("{}/graphql", mock_server.uri()))
        .service_token(test_token())
        .max_retries(0)
        .build()
        .unwrap();

    let err = client.environment_metadata(env()).await.unwrap_err();
    assert!(matches!(err, ClientError::MaxRetriesExceeded(1)), "{err:?}");
}

#[tokio::test]
async fn test_definition_state_model_count() {
    let mock_server = MockServer::start().await;
    mount_graphql(
        &mock_server,
        "DefinitionStateSummary",
        load_fixture("discovery/definition_state.json"),
    )
    .await;

    let summary = discovery_client(&mock_server)
        .definition_state(env())
        .await
        .unwrap();

    assert_eq!(summary.model_count(), 3);
    assert_eq!(summary.resource_counts.get("test"), Some(&14));
}

#[tokio::test]
async fn test_applied_models_fixture_decodes() {
    let mock_server = MockServer::start().await;
    mount_applied_models(&mock_server).await;

    let models = discovery_client(&mock_server)
        .applied_models(
            env(),
            &AppliedModelFilter::default(),
            &FieldSelection::everything(),
            100,
        )
        .await
        .unwrap();

    assert_eq!(models.len(), 3);
    let rev = &models[0];
    assert_eq!(rev.unique_id, "model.jaffle_shop.rev_model");
    assert_eq!(rev.db_schema.as_deref(), Some("dbt_prod"));
    assert_eq!(rev.execution_time(), Some(12.0));
    assert_eq!(rev.execution_info.last_run_status, Some(RunOutcome::Success));
    // `meta` keys are passed through untouched
    assert_eq!(rev.meta.get("sla_hours"), Some(&json!(4)));
    assert_eq!(models[2].execution_time(), None);
}

#[tokio::test]
async fn test_applied_models_follow_cursors() {
    let mock_server = MockServer::start().await;
    let generator = AppliedModelGenerator::new().with_package("jaffle_shop");
    let first_page: Vec<_> = (0..3).map(|i| generator.generate_one(i)).collect();
    let second_page: Vec<_> = (3..5).map(|i| generator.generate_one(i)).collect();

    graphql("AppliedModels")
        .and(body_partial_json(json!({ "variables": { "after": "page-1" } })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(applied_models_page(second_page, None, false)),
        )
        .expect(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    graphql("AppliedModels")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(applied_models_page(first_page, Some("page-1"), true)),
        )
        .expect(1)
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let models = discovery_client(&mock_server)
        .applied_models(
            env(),
            &AppliedModelFilter::default(),
            &FieldSelection::everything(),
            usize::MAX,
        )
        .await
        .unwrap();

    assert_eq!(models.len(), 5);
    let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
    assert!(names[4].ends_with("_4"));
}

#[tokio::test]
async fn test_applied_models_stop_at_limit() {
    let mock_server = MockServer::start().await;
    let nodes = AppliedModelGenerator::new().with_count(4).generate();

    graphql("AppliedModels")
        .and(body_partial_json(json!({ "variables": { "first": 2 } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(applied_models_page(nodes, Some("more"), true)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let models = discovery_client(&mock_server)
        .applied_models(
            env(),
            &AppliedModelFilter::default(),
            &FieldSelection::everything(),
            2,
        )
        .await
        .unwrap();

    assert_eq!(models.len(), 2);
}

#[tokio::test]
async fn test_missing_edges_is_unexpected_shape() {
    let mock_server = MockServer::start().await;
    mount_graphql(
        &mock_server,
        "AppliedModels",
        json!({ "data": { "environment": { "applied": { "models": { "pageInfo": {} } } } } }),
    )
    .await;

    let err = discovery_client(&mock_server)
        .applied_models(
            env(),
            &AppliedModelFilter::default(),
            &FieldSelection::everything(),
            10,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::UnexpectedShape { .. }), "{err:?}");
}

#[tokio::test]
async fn test_batch_historical_runs_fills_missing_models() {
    let mock_server = MockServer::start().await;
    graphql("BatchModelHistoricalRuns")
        .and(body_partial_json(json!({
            "variables": { "identifier0": "m1", "identifier1": "m2", "lastRunCount": 5 }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(load_fixture("discovery/batch_historical_runs.json")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let names = vec!["m1".to_string(), "m2".to_string()];
    let runs = discovery_client(&mock_server)
        .batch_historical_runs(env(), &names, 5)
        .await
        .unwrap();

    assert_eq!(runs.len(), 2);
    assert_eq!(runs["m1"].len(), 2);
    assert_eq!(runs["m1"][0].execution_time, Some(3.0));
    assert!(runs["m2"].is_empty());
}

#[tokio::test]
async fn test_batch_of_fifteen_sends_ten_aliases() {
    let mock_server = MockServer::start().await;
    mount_graphql(
        &mock_server,
        "BatchModelHistoricalRuns",
        json!({ "data": { "environment": { "applied": {} } } }),
    )
    .await;

    let names: Vec<String> = (0..15).map(|i| format!("model_{i:02}")).collect();
    let runs = discovery_client(&mock_server)
        .batch_historical_runs(env(), &names, 3)
        .await
        .unwrap();

    assert_eq!(runs.len(), 10);
    assert!(runs.contains_key("model_09"));
    assert!(!runs.contains_key("model_10"));

    let bodies = bodies_for(&mock_server, "BatchModelHistoricalRuns").await;
    assert_eq!(bodies.len(), 1);
    let variables = bodies[0]["variables"].as_object().unwrap();
    assert_eq!(variables["identifier9"], json!("model_09"));
    assert!(!variables.contains_key("identifier10"));
}

#[tokio::test]
async fn test_model_historical_runs() {
    let mock_server = MockServer::start().await;
    mount_graphql(
        &mock_server,
        "ModelHistoricalRuns",
        json!({
            "data": { "environment": { "applied": { "modelHistoricalRuns": [
                { "name": "rev_model", "resourceType": "model", "runId": 2, "status": "success", "executionTime": 12.0 },
                { "name": "rev_model", "resourceType": "model", "runId": 1, "status": "error", "error": "boom", "executionTime": 0.5 }
            ] } } }
        }),
    )
    .await;

    let runs = discovery_client(&mock_server)
        .model_historical_runs(env(), "rev_model", 2, &FieldSelection::runtime())
        .await
        .unwrap();

    assert_eq!(runs.len(), 2);
    let last = runs[1].run_status().unwrap().unwrap();
    assert_eq!(last.status, RunOutcome::Error);
    assert_eq!(last.error_message.as_deref(), Some("boom"));
}

#[tokio::test]
async fn test_job_models() {
    let mock_server = MockServer::start().await;
    graphql("JobModels")
        .and(body_partial_json(json!({ "variables": { "jobId": 411, "runId": 70403103 } })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("discovery/job_models.json")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let job = JobId::new(411).unwrap();
    let models = discovery_client(&mock_server)
        .job_models(job, Some(RunId::new(70403103).unwrap()), &FieldSelection::everything())
        .await
        .unwrap();

    assert_eq!(models.len(), 3);
    assert_eq!(models[2].outcome().unwrap(), Some(RunOutcome::Error));
    assert_eq!(models[2].execution_time(), Some(30.25));
}

#[tokio::test]
async fn test_job_model_not_found() {
    let mock_server = MockServer::start().await;
    mount_graphql(
        &mock_server,
        "JobModel",
        json!({ "data": { "job": { "model": null } } }),
    )
    .await;

    let err = discovery_client(&mock_server)
        .job_model(
            JobId::new(411).unwrap(),
            None,
            "model.jaffle_shop.missing",
            &FieldSelection::everything(),
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_definition_models_follow_cursors() {
    let mock_server = MockServer::start().await;

    graphql("DefinitionModels")
        .and(body_partial_json(json!({ "variables": { "after": "def-1" } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(load_fixture("discovery/definition_models_page_2.json")),
        )
        .expect(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    graphql("DefinitionModels")
        .and(body_partial_json(json!({ "variables": { "environmentId": ENV_ID } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(load_fixture("discovery/definition_models_page_1.json")),
        )
        .expect(1)
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let models = discovery_client(&mock_server)
        .definition_models(
            env(),
            &DefinitionFilter::models(),
            &FieldSelection::everything(),
            usize::MAX,
        )
        .await
        .unwrap();

    let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["customers", "orders", "stg_payments"]);

    let customers = &models[0];
    assert_eq!(customers.project_id, 70403103932520);
    assert_eq!(customers.materialized_type.as_deref(), Some("table"));
    assert_eq!(customers.contract_enforced, Some(true));
    assert!(customers.raw_code.as_deref().unwrap().contains("stg_customers"));
    assert_eq!(customers.meta["owner"], json!("analytics"));
    assert!(models[1].tags.is_empty());
    assert_eq!(models[2].materialized_type.as_deref(), Some("view"));

    let bodies = bodies_for(&mock_server, "DefinitionModels").await;
    assert_eq!(bodies.len(), 2);
    let document = bodies[0]["query"].as_str().unwrap();
    assert!(document.contains("... on ModelDefinitionNode"));
}

#[tokio::test]
async fn test_definition_models_stop_at_limit() {
    let mock_server = MockServer::start().await;
    graphql("DefinitionModels")
        .and(body_partial_json(json!({ "variables": { "first": 1 } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(load_fixture("discovery/definition_models_page_1.json")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let models = discovery_client(&mock_server)
        .definition_models(env(), &DefinitionFilter::models(), &FieldSelection::everything(), 1)
        .await
        .unwrap();

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].unique_id, "model.jaffle_shop.customers");
}

#[tokio::test]
async fn test_invalid_definition_node_fails_page() {
    let mock_server = MockServer::start().await;
    let mut page = load_fixture("discovery/definition_models_page_2.json");
    page["data"]["environment"]["definition"]["resources"]["edges"][0]["node"]
        .as_object_mut()
        .unwrap()
        .remove("filePath");
    mount_graphql(&mock_server, "DefinitionModels", page).await;

    let err = discovery_client(&mock_server)
        .definition_models_page(env(), &DefinitionModelsRequest::default())
        .await
        .unwrap_err();

    assert!(err.is_validation());
    match err {
        ClientError::Validation { entity, message } => {
            assert_eq!(entity, "ModelDefinition");
            assert!(message.contains("file_path"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_job_metadata_resolves_latest_run() {
    let mock_server = MockServer::start().await;
    graphql("JobMetadata")
        .and(body_partial_json(json!({ "variables": { "jobId": 411 } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "job": { "id": 411, "runId": "70403103" } } })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let job = discovery_client(&mock_server)
        .job_metadata(JobId::new(411).unwrap(), None)
        .await
        .unwrap();

    assert_eq!(job.id, 411);
    assert_eq!(job.run_id, Some(70403103));

    let bodies = bodies_for(&mock_server, "JobMetadata").await;
    assert!(bodies[0]["variables"].get("runId").is_none());
}

#[tokio::test]
async fn test_null_job_is_not_found() {
    let mock_server = MockServer::start().await;
    mount_graphql(&mock_server, "JobMetadata", json!({ "data": { "job": null } })).await;

    let err = discovery_client(&mock_server)
        .job_metadata(JobId::new(411).unwrap(), Some(RunId::new(5).unwrap()))
        .await
        .unwrap_err();

    match err {
        ClientError::NotFound { kind, name } => {
            assert_eq!(kind, "Job");
            assert_eq!(name, "411 (run 5)");
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn test_job_tests_report_failures() {
    let mock_server = MockServer::start().await;
    let tests = load_fixture("discovery/job_models_and_tests.json")["data"]["job"]["tests"].clone();
    graphql("JobTests")
        .and(body_partial_json(json!({ "variables": { "jobId": 411, "runId": 70403103 } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "job": { "tests": tests } } })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let tests = discovery_client(&mock_server)
        .job_tests(
            JobId::new(411).unwrap(),
            Some(RunId::new(70403103).unwrap()),
            &FieldSelection::everything(),
        )
        .await
        .unwrap();

    assert_eq!(tests.len(), 2);
    assert!(!tests[0].has_failures());
    assert!(tests[1].has_failures());
    assert_eq!(tests[1].column_name.as_deref(), Some("id"));
    assert!(tests[1].error.as_deref().unwrap().starts_with("Got 2 results"));
}

#[tokio::test]
async fn test_job_test_found_and_missing() {
    let mock_server = MockServer::start().await;
    let test = load_fixture("discovery/job_models_and_tests.json")["data"]["job"]["tests"][1].clone();
    graphql("JobTest")
        .and(body_partial_json(json!({
            "variables": { "uniqueId": "test.jaffle_shop.unique_rev_model_id" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "job": { "test": test } } })),
        )
        .expect(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    graphql("JobTest")
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "job": { "test": null } } })),
        )
        .expect(1)
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let client = discovery_client(&mock_server);
    let job = JobId::new(411).unwrap();
    let found = client
        .job_test(job, None, "test.jaffle_shop.unique_rev_model_id", &FieldSelection::everything())
        .await
        .unwrap();
    assert_eq!(found.state.as_deref(), Some("fail"));
    assert_eq!(found.run.run_id, Some(70403103));

    let err = client
        .job_test(job, None, "test.jaffle_shop.missing", &FieldSelection::everything())
        .await
        .unwrap_err();
    match err {
        ClientError::NotFound { kind, name } => {
            assert_eq!(kind, "Test");
            assert_eq!(name, "test.jaffle_shop.missing");
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn test_job_models_and_tests_in_one_request() {
    let mock_server = MockServer::start().await;
    graphql("JobModelsAndTests")
        .and(body_partial_json(json!({ "variables": { "jobId": 411 } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(load_fixture("discovery/job_models_and_tests.json")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let nodes = discovery_client(&mock_server)
        .job_models_and_tests(JobId::new(411).unwrap(), None, &FieldSelection::everything())
        .await
        .unwrap();

    assert_eq!(nodes.job.id, 411);
    assert_eq!(nodes.job.run_id, Some(70403103));
    assert_eq!(nodes.models.len(), 1);
    assert_eq!(nodes.models[0].outcome().unwrap(), Some(RunOutcome::Success));
    assert_eq!(nodes.tests.iter().filter(|t| t.has_failures()).count(), 1);
}

#[tokio::test]
async fn test_job_models_and_tests_rejects_negative_timing() {
    let mock_server = MockServer::start().await;
    let mut body = load_fixture("discovery/job_models_and_tests.json");
    body["data"]["job"]["tests"][0]["executionTime"] = json!(-1.0);
    mount_graphql(&mock_server, "JobModelsAndTests", body).await;

    let err = discovery_client(&mock_server)
        .job_models_and_tests(JobId::new(411).unwrap(), None, &FieldSelection::everything())
        .await
        .unwrap_err();

    assert!(err.is_validation());
}
