//! Builders for every Discovery query the client issues.

use dbt_discovery_config::constants::{DEFAULT_MODEL_PAGE_SIZE, MAX_BATCH_ALIASES};
use serde_json::{Value, json};
use tracing::debug;

use super::document::{BuiltQuery, Field, QueryDocument, Selection};
use super::fields::{
    APPLIED_MODEL_FIELDS, DEFINITION_MODEL_FIELDS, DEFINITION_NODE_FIELDS, EXECUTION_INFO_FIELDS,
    FieldSelection, FieldSpec, HISTORICAL_RUN_FIELDS, JOB_MODEL_FIELDS, JOB_TEST_FIELDS,
    select_fields,
};
use super::filters::{AppliedModelFilter, DefinitionFilter};
use super::{EnvironmentId, JobId, RunId};
use crate::error::{ClientError, Result};

/// Largest `first` the Discovery API accepts on model connections.
const MAX_PAGE_SIZE: usize = 500;

/// Most historical runs the API returns for one model.
const MAX_LAST_RUN_COUNT: usize = 20;

const PAGE_INFO_FIELDS: &[&str] = &["hasNextPage", "hasPreviousPage", "startCursor", "endCursor"];

/// Parameters of one `applied.models` page.
#[derive(Debug, Clone)]
pub struct AppliedModelsRequest {
    pub first: usize,
    pub after: Option<String>,
    pub filter: AppliedModelFilter,
    pub fields: FieldSelection,
}

impl Default for AppliedModelsRequest {
    fn default() -> Self {
        Self {
            first: DEFAULT_MODEL_PAGE_SIZE,
            after: None,
            filter: AppliedModelFilter::default(),
            fields: FieldSelection::default(),
        }
    }
}

/// Parameters of one `definition.resources` page.
#[derive(Debug, Clone)]
pub struct DefinitionModelsRequest {
    pub first: usize,
    pub after: Option<String>,
    pub filter: DefinitionFilter,
    pub fields: FieldSelection,
}

impl Default for DefinitionModelsRequest {
    fn default() -> Self {
        Self {
            first: DEFAULT_MODEL_PAGE_SIZE,
            after: None,
            filter: DefinitionFilter::models(),
            fields: FieldSelection::default(),
        }
    }
}

/// A batched historical-runs query and its alias table.
#[derive(Debug, Clone)]
pub struct BatchQuery {
    pub query: BuiltQuery,
    /// `(alias, model name)` in alias order.
    pub aliases: Vec<(String, String)>,
}

impl BatchQuery {
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(|(_, name)| name.as_str())
    }
}

fn environment_document(operation: &'static str, env: EnvironmentId) -> QueryDocument {
    let mut doc = QueryDocument::new(operation);
    doc.variable("environmentId", "BigInt!", json!(env.get()));
    doc
}

fn environment_field() -> Field {
    Field::new("environment").arg("id", "environmentId")
}

fn connection(inner: Field, node: Vec<Selection>) -> Field {
    inner
        .select(Field::new("pageInfo").scalars(PAGE_INFO_FIELDS.iter().copied()))
        .select(
            Field::new("edges")
                .scalars(["cursor"])
                .select(Field::new("node").select_all(node)),
        )
}

fn check_page_size(first: usize) -> Result<usize> {
    if first == 0 || first > MAX_PAGE_SIZE {
        return Err(ClientError::InvalidArgument(format!(
            "page size must be between 1 and {MAX_PAGE_SIZE}, got {first}"
        )));
    }
    Ok(first)
}

fn check_run_count(count: usize) -> Result<usize> {
    if count == 0 || count > MAX_LAST_RUN_COUNT {
        return Err(ClientError::InvalidArgument(format!(
            "last run count must be between 1 and {MAX_LAST_RUN_COUNT}, got {count}"
        )));
    }
    Ok(count)
}

fn check_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ClientError::InvalidArgument(
            "model name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Project name and adapter type of an environment.
pub fn environment_metadata(env: EnvironmentId) -> BuiltQuery {
    let mut doc = environment_document("EnvironmentMetadata", env);
    doc.select(
        environment_field()
            .scalars(["dbtProjectName", "adapterType"])
            .select(Field::new("applied").scalars(["lastUpdatedAt"])),
    );
    doc.build(&["environment"])
}

/// Freshness and resource counts of the applied state.
pub fn applied_state_summary(env: EnvironmentId) -> BuiltQuery {
    let mut doc = environment_document("AppliedStateSummary", env);
    doc.select(environment_field().select(Field::new("applied").scalars([
        "lastUpdatedAt",
        "resourceCounts",
        "latestGitSha",
    ])));
    doc.build(&["environment", "applied"])
}

/// Freshness and resource counts of the definition state.
pub fn definition_state_summary(env: EnvironmentId) -> BuiltQuery {
    let mut doc = environment_document("DefinitionStateSummary", env);
    doc.select(
        environment_field()
            .select(Field::new("definition").scalars(["lastUpdatedAt", "resourceCounts"])),
    );
    doc.build(&["environment", "definition"])
}

fn applied_model_selections(fields: &FieldSelection) -> Vec<Selection> {
    let mut node = select_fields(fields, APPLIED_MODEL_FIELDS);
    let execution = select_fields(fields, EXECUTION_INFO_FIELDS);
    if !execution.is_empty() {
        node.push(Field::new("executionInfo").select_all(execution).into());
    }
    node
}

/// One page of applied-state models.
pub fn applied_models(env: EnvironmentId, request: &AppliedModelsRequest) -> Result<BuiltQuery> {
    let first = check_page_size(request.first)?;
    let mut doc = environment_document("AppliedModels", env);
    doc.variable("first", "Int", json!(first));

    let mut models = Field::new("models").arg("first", "first");
    if let Some(after) = &request.after {
        doc.variable("after", "String", json!(after));
        models = models.arg("after", "after");
    }
    if let Some(filter) = request.filter.to_graphql() {
        doc.variable("filter", "ModelAppliedFilter", filter);
        models = models.arg("filter", "filter");
    }

    let models = connection(models, applied_model_selections(&request.fields));
    doc.select(environment_field().select(Field::new("applied").select(models)));
    debug!(environment_id = %env, first, after = ?request.after, "Built applied models query");
    Ok(doc.build(&["environment", "applied", "models"]))
}

/// One page of model definitions.
pub fn definition_models(
    env: EnvironmentId,
    request: &DefinitionModelsRequest,
) -> Result<BuiltQuery> {
    let filter = request.filter.to_graphql()?;
    let first = check_page_size(request.first)?;

    let mut doc = environment_document("DefinitionModels", env);
    doc.variable("filter", "DefinitionResourcesFilter!", filter);
    doc.variable("first", "Int", json!(first));

    let mut resources = Field::new("resources")
        .arg("filter", "filter")
        .arg("first", "first");
    if let Some(after) = &request.after {
        doc.variable("after", "String", json!(after));
        resources = resources.arg("after", "after");
    }

    let mut node = select_fields(&request.fields, DEFINITION_NODE_FIELDS);
    let model_only = select_fields(&request.fields, DEFINITION_MODEL_FIELDS);
    if !model_only.is_empty() {
        node.push(Selection::InlineFragment {
            type_condition: "ModelDefinitionNode".to_string(),
            selections: model_only,
        });
    }

    doc.select(
        environment_field().select(Field::new("definition").select(connection(resources, node))),
    );
    debug!(environment_id = %env, first, "Built definition models query");
    Ok(doc.build(&["environment", "definition", "resources"]))
}

fn historical_runs_field(fields: &FieldSelection, identifier_var: &str) -> Field {
    Field::new("modelHistoricalRuns")
        .arg("identifier", identifier_var)
        .arg("lastRunCount", "lastRunCount")
        .select_all(select_fields(fields, HISTORICAL_RUN_FIELDS))
}

/// Last `count` runs of the model named `name`.
pub fn model_historical_runs(
    env: EnvironmentId,
    name: &str,
    count: usize,
    fields: &FieldSelection,
) -> Result<BuiltQuery> {
    check_identifier(name)?;
    let count = check_run_count(count)?;

    let mut doc = environment_document("ModelHistoricalRuns", env);
    doc.variable("identifier", "String", json!(name));
    doc.variable("lastRunCount", "Int", json!(count));
    doc.select(
        environment_field()
            .select(Field::new("applied").select(historical_runs_field(fields, "identifier"))),
    );
    Ok(doc.build(&["environment", "applied", "modelHistoricalRuns"]))
}

/// One aliased query fetching historical runs for several models.
///
/// Duplicate names are dropped and at most `MAX_BATCH_ALIASES` names are
/// kept, in input order. Excess names are ignored without error.
pub fn batch_historical_runs(
    env: EnvironmentId,
    names: &[String],
    count: usize,
    fields: &FieldSelection,
) -> Result<BatchQuery> {
    let count = check_run_count(count)?;

    let mut unique: Vec<&str> = Vec::with_capacity(names.len().min(MAX_BATCH_ALIASES));
    for name in names {
        check_identifier(name)?;
        if !unique.contains(&name.as_str()) {
            unique.push(name);
        }
    }
    if unique.is_empty() {
        return Err(ClientError::InvalidArgument(
            "batch query needs at least one model name".to_string(),
        ));
    }
    if unique.len() > MAX_BATCH_ALIASES {
        debug!(
            requested = unique.len(),
            cap = MAX_BATCH_ALIASES,
            "Truncating batched historical runs query"
        );
        unique.truncate(MAX_BATCH_ALIASES);
    }

    let mut doc = environment_document("BatchModelHistoricalRuns", env);
    doc.variable("lastRunCount", "Int", json!(count));

    let mut applied = Field::new("applied");
    let mut aliases = Vec::with_capacity(unique.len());
    for (idx, name) in unique.iter().enumerate() {
        let alias = format!("model_{idx}");
        let variable = format!("identifier{idx}");
        doc.variable(variable.clone(), "String", json!(name));
        applied = applied.select(historical_runs_field(fields, &variable).alias(alias.clone()));
        aliases.push((alias, (*name).to_string()));
    }
    doc.select(environment_field().select(applied));

    Ok(BatchQuery {
        query: doc.build(&["environment", "applied"]),
        aliases,
    })
}

fn job_document(operation: &'static str, job: JobId, run_id: Option<RunId>) -> (QueryDocument, Field) {
    let mut doc = QueryDocument::new(operation);
    doc.variable("jobId", "BigInt!", json!(job.get()));
    let mut field = Field::new("job").arg("id", "jobId");
    if let Some(run_id) = run_id {
        doc.variable("runId", "BigInt", json!(run_id.get()));
        field = field.arg("runId", "runId");
    }
    (doc, field)
}

/// Id and run id of a job (optionally one specific run).
pub fn job_metadata(job: JobId, run_id: Option<RunId>) -> BuiltQuery {
    let (mut doc, field) = job_document("JobMetadata", job, run_id);
    doc.select(field.scalars(["id", "runId"]));
    doc.build(&["job"])
}

fn job_collection(
    operation: &'static str,
    job: JobId,
    run_id: Option<RunId>,
    collection: &'static str,
    fields: &FieldSelection,
    specs: &[FieldSpec],
) -> BuiltQuery {
    let (mut doc, field) = job_document(operation, job, run_id);
    doc.select(field.select(Field::new(collection).select_all(select_fields(fields, specs))));
    doc.build(&["job", collection])
}

/// Models executed by a job run.
pub fn job_models(job: JobId, run_id: Option<RunId>, fields: &FieldSelection) -> BuiltQuery {
    job_collection("JobModels", job, run_id, "models", fields, JOB_MODEL_FIELDS)
}

/// Tests executed by a job run.
pub fn job_tests(job: JobId, run_id: Option<RunId>, fields: &FieldSelection) -> BuiltQuery {
    job_collection("JobTests", job, run_id, "tests", fields, JOB_TEST_FIELDS)
}

fn job_single(
    operation: &'static str,
    job: JobId,
    run_id: Option<RunId>,
    node: &'static str,
    unique_id: &str,
    fields: &FieldSelection,
    specs: &[FieldSpec],
) -> Result<BuiltQuery> {
    if unique_id.trim().is_empty() {
        return Err(ClientError::InvalidArgument(
            "unique id must not be empty".to_string(),
        ));
    }
    let (mut doc, field) = job_document(operation, job, run_id);
    doc.variable("uniqueId", "String!", Value::String(unique_id.to_string()));
    doc.select(
        field.select(
            Field::new(node)
                .arg("uniqueId", "uniqueId")
                .select_all(select_fields(fields, specs)),
        ),
    );
    Ok(doc.build(&["job", node]))
}

/// One model of a job run by unique id.
pub fn job_model(
    job: JobId,
    run_id: Option<RunId>,
    unique_id: &str,
    fields: &FieldSelection,
) -> Result<BuiltQuery> {
    job_single("JobModel", job, run_id, "model", unique_id, fields, JOB_MODEL_FIELDS)
}

/// One test of a job run by unique id.
pub fn job_test(
    job: JobId,
    run_id: Option<RunId>,
    unique_id: &str,
    fields: &FieldSelection,
) -> Result<BuiltQuery> {
    job_single("JobTest", job, run_id, "test", unique_id, fields, JOB_TEST_FIELDS)
}

/// Job metadata plus its models and tests in one round trip.
pub fn job_models_and_tests(
    job: JobId,
    run_id: Option<RunId>,
    fields: &FieldSelection,
) -> BuiltQuery {
    let (mut doc, field) = job_document("JobModelsAndTests", job, run_id);
    doc.select(
        field
            .scalars(["id", "runId"])
            .select(Field::new("models").select_all(select_fields(fields, JOB_MODEL_FIELDS)))
            .select(Field::new("tests").select_all(select_fields(fields, JOB_TEST_FIELDS))),
    );
    doc.build(&["job"])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvironmentId {
        EnvironmentId::new(42).unwrap()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("model_{i:02}")).collect()
    }

    #[test]
    fn test_environment_metadata_query() {
        let query = environment_metadata(env());
        assert!(
            query
                .document
                .starts_with("query EnvironmentMetadata($environmentId: BigInt!) {")
        );
        assert!(query.document.contains("dbtProjectName"));
        assert_eq!(query.variables, json!({"environmentId": 42}));
        assert_eq!(query.path(), vec!["environment"]);
    }

    #[test]
    fn test_applied_models_query_variables() {
        let request = AppliedModelsRequest {
            first: 50,
            after: Some("cursor-1".into()),
            filter: AppliedModelFilter::new().with_tag("finance"),
            fields: FieldSelection::new().include_timing(true),
        };
        let query = applied_models(env(), &request).unwrap();

        assert!(query.document.contains(
            "($environmentId: BigInt!, $first: Int, $after: String, $filter: ModelAppliedFilter)"
        ));
        assert!(
            query
                .document
                .contains("models(first: $first, after: $after, filter: $filter)")
        );
        assert!(query.document.contains("executionTime"));
        assert!(!query.document.contains("lastRunStatus"));
        assert!(!query.document.contains("packageName"));
        assert!(query.document.contains("materializedType"));
        assert_eq!(query.variables["after"], json!("cursor-1"));
        assert_eq!(query.variables["filter"], json!({"tags": ["finance"]}));
        assert!(!query.document.contains("finance"));
        assert_eq!(query.path(), vec!["environment", "applied", "models"]);
    }

    #[test]
    fn test_applied_models_omits_execution_info_when_unselected() {
        let request = AppliedModelsRequest {
            fields: FieldSelection::new().include_database(true),
            ..AppliedModelsRequest::default()
        };
        let query = applied_models(env(), &request).unwrap();
        assert!(!query.document.contains("executionInfo"));
        assert!(!query.document.contains("$after"));
        assert!(!query.document.contains("$filter"));
    }

    #[test]
    fn test_page_size_bounds() {
        let request = AppliedModelsRequest {
            first: 0,
            ..AppliedModelsRequest::default()
        };
        assert!(applied_models(env(), &request).is_err());

        let request = AppliedModelsRequest {
            first: 501,
            ..AppliedModelsRequest::default()
        };
        assert!(applied_models(env(), &request).is_err());
    }

    #[test]
    fn test_definition_models_uses_fragment() {
        let query = definition_models(env(), &DefinitionModelsRequest::default()).unwrap();
        assert!(query.document.contains("$filter: DefinitionResourcesFilter!"));
        assert!(query.document.contains("... on ModelDefinitionNode {"));
        assert!(query.document.contains("rawCode"));
        assert_eq!(query.variables["filter"], json!({"types": ["Model"]}));
    }

    #[test]
    fn test_definition_models_rejects_empty_types() {
        let request = DefinitionModelsRequest {
            filter: DefinitionFilter {
                types: Vec::new(),
                tags: Vec::new(),
                unique_ids: Vec::new(),
            },
            ..DefinitionModelsRequest::default()
        };
        let err = definition_models(env(), &request).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_historical_runs_query() {
        let query =
            model_historical_runs(env(), "orders", 3, &FieldSelection::runtime()).unwrap();
        assert!(
            query
                .document
                .contains("modelHistoricalRuns(identifier: $identifier, lastRunCount: $lastRunCount)")
        );
        assert_eq!(query.variables["identifier"], json!("orders"));
        assert_eq!(query.variables["lastRunCount"], json!(3));
        assert!(!query.document.contains("rawSql"));
        assert!(model_historical_runs(env(), "", 3, &FieldSelection::runtime()).is_err());
        assert!(model_historical_runs(env(), "orders", 0, &FieldSelection::runtime()).is_err());
    }

    #[test]
    fn test_batch_caps_at_ten_aliases() {
        let batch = batch_historical_runs(env(), &names(15), 5, &FieldSelection::runtime()).unwrap();

        assert_eq!(batch.aliases.len(), MAX_BATCH_ALIASES);
        assert_eq!(batch.aliases[0], ("model_0".to_string(), "model_00".to_string()));
        assert_eq!(batch.aliases[9].1, "model_09");
        assert!(batch.query.document.contains("model_9: modelHistoricalRuns"));
        assert!(!batch.query.document.contains("model_10:"));
        assert!(batch.query.variables.get("identifier10").is_none());
        assert_eq!(batch.query.variables["identifier3"], json!("model_03"));
    }

    #[test]
    fn test_batch_deduplicates_names() {
        let requested = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let batch = batch_historical_runs(env(), &requested, 1, &FieldSelection::runtime()).unwrap();
        assert_eq!(batch.model_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_batch_rejects_empty_input() {
        assert!(batch_historical_runs(env(), &[], 1, &FieldSelection::runtime()).is_err());
    }

    #[test]
    fn test_job_queries_scope_to_run() {
        let job = JobId::new(9).unwrap();
        let query = job_models(job, Some(RunId::new(77).unwrap()), &FieldSelection::new());
        assert!(
            query
                .document
                .starts_with("query JobModels($jobId: BigInt!, $runId: BigInt) {")
        );
        assert!(query.document.contains("job(id: $jobId, runId: $runId)"));
        assert_eq!(query.path(), vec!["job", "models"]);
        assert_eq!(query.variables["runId"], json!(77));

        let query = job_tests(job, None, &FieldSelection::new().include_status(true));
        assert!(!query.document.contains("runId"));
        assert!(query.document.contains("warn"));

        let query = job_model(job, None, "model.jaffle.orders", &FieldSelection::new()).unwrap();
        assert!(query.document.contains("model(uniqueId: $uniqueId)"));
        assert_eq!(query.variables["uniqueId"], json!("model.jaffle.orders"));

        let query = job_models_and_tests(job, None, &FieldSelection::new());
        assert!(query.document.contains("models {"));
        assert!(query.document.contains("tests {"));
    }
}
