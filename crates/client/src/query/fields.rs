//! Field-group selection for Discovery queries.
//!
//! Every node kind has a static table of `(field, group)` pairs. A
//! [`FieldSelection`] decides which groups are emitted.
//!
//! Invariants:
//! - `Always` fields are emitted for every selection.
//! - With no option set at all, every group is emitted.
//! - Once any option is set explicitly, only groups set to `true` are emitted
//!   (unless `include_all` is `true`).

use super::document::{Field, Selection};

/// Named group of optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Always,
    Database,
    RunMetadata,
    Timing,
    Status,
    Code,
    Dependencies,
    Metadata,
}

/// Which optional field groups a query requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldSelection {
    include_database: Option<bool>,
    include_run_metadata: Option<bool>,
    include_timing: Option<bool>,
    include_status: Option<bool>,
    include_code: Option<bool>,
    include_dependencies: Option<bool>,
    include_metadata: Option<bool>,
    include_all: Option<bool>,
}

impl FieldSelection {
    /// No option set: every group is included.
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly include every group.
    pub fn everything() -> Self {
        Self::new().include_all(true)
    }

    /// Only the fields needed to rank models by runtime.
    pub fn runtime() -> Self {
        Self::new().include_timing(true).include_status(true).include_run_metadata(true)
    }

    pub fn include_database(mut self, on: bool) -> Self {
        self.include_database = Some(on);
        self
    }

    pub fn include_run_metadata(mut self, on: bool) -> Self {
        self.include_run_metadata = Some(on);
        self
    }

    pub fn include_timing(mut self, on: bool) -> Self {
        self.include_timing = Some(on);
        self
    }

    pub fn include_status(mut self, on: bool) -> Self {
        self.include_status = Some(on);
        self
    }

    pub fn include_code(mut self, on: bool) -> Self {
        self.include_code = Some(on);
        self
    }

    pub fn include_dependencies(mut self, on: bool) -> Self {
        self.include_dependencies = Some(on);
        self
    }

    pub fn include_metadata(mut self, on: bool) -> Self {
        self.include_metadata = Some(on);
        self
    }

    pub fn include_all(mut self, on: bool) -> Self {
        self.include_all = Some(on);
        self
    }

    fn is_unconfigured(&self) -> bool {
        self.include_all.is_none()
            && [
                self.include_database,
                self.include_run_metadata,
                self.include_timing,
                self.include_status,
                self.include_code,
                self.include_dependencies,
                self.include_metadata,
            ]
            .iter()
            .all(Option::is_none)
    }

    /// Whether fields of `group` are emitted.
    pub fn includes(&self, group: FieldGroup) -> bool {
        if group == FieldGroup::Always || self.include_all == Some(true) || self.is_unconfigured()
        {
            return true;
        }
        let flag = match group {
            FieldGroup::Always => return true,
            FieldGroup::Database => self.include_database,
            FieldGroup::RunMetadata => self.include_run_metadata,
            FieldGroup::Timing => self.include_timing,
            FieldGroup::Status => self.include_status,
            FieldGroup::Code => self.include_code,
            FieldGroup::Dependencies => self.include_dependencies,
            FieldGroup::Metadata => self.include_metadata,
        };
        flag == Some(true)
    }
}

/// One entry of a node's field table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldSpec {
    pub name: &'static str,
    pub group: FieldGroup,
    /// Scalar sub-fields for object-typed fields.
    pub children: &'static [&'static str],
}

const fn scalar(name: &'static str, group: FieldGroup) -> FieldSpec {
    FieldSpec {
        name,
        group,
        children: &[],
    }
}

const fn object(
    name: &'static str,
    group: FieldGroup,
    children: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        name,
        group,
        children,
    }
}

use FieldGroup::{Always, Code, Database, Dependencies, Metadata, RunMetadata, Status, Timing};

/// `ModelAppliedStateNode`.
pub(crate) const APPLIED_MODEL_FIELDS: &[FieldSpec] = &[
    scalar("name", Always),
    scalar("uniqueId", Always),
    scalar("description", Always),
    scalar("tags", Always),
    scalar("meta", Always),
    scalar("filePath", Always),
    scalar("materializedType", Always),
    scalar("database", Database),
    scalar("schema", Database),
    scalar("alias", Database),
    scalar("fqn", Metadata),
    scalar("packageName", Metadata),
    scalar("contractEnforced", Metadata),
    scalar("language", Metadata),
    scalar("access", Metadata),
    scalar("group", Metadata),
];

/// `ModelExecutionInfoNode`, nested under applied models as `executionInfo`.
pub(crate) const EXECUTION_INFO_FIELDS: &[FieldSpec] = &[
    scalar("lastRunId", RunMetadata),
    scalar("lastSuccessJobDefinitionId", RunMetadata),
    scalar("lastSuccessRunId", RunMetadata),
    scalar("lastRunStatus", Status),
    scalar("lastRunError", Status),
    scalar("runGeneratedAt", Timing),
    scalar("runElapsedTime", Timing),
    scalar("compileStartedAt", Timing),
    scalar("compileCompletedAt", Timing),
    scalar("executeStartedAt", Timing),
    scalar("executeCompletedAt", Timing),
    scalar("executionTime", Timing),
];

/// `EnvironmentDefinitionNode` interface fields.
pub(crate) const DEFINITION_NODE_FIELDS: &[FieldSpec] = &[
    scalar("name", Always),
    scalar("uniqueId", Always),
    scalar("description", Always),
    scalar("tags", Always),
    scalar("meta", Always),
    scalar("filePath", Always),
    scalar("resourceType", Always),
    scalar("projectId", Always),
    scalar("environmentId", Always),
    scalar("accountId", Always),
    scalar("runGeneratedAt", Metadata),
];

/// `ModelDefinitionNode`-only fields.
pub(crate) const DEFINITION_MODEL_FIELDS: &[FieldSpec] = &[
    scalar("materializedType", Always),
    scalar("database", Database),
    scalar("schema", Database),
    scalar("alias", Database),
    scalar("fqn", Metadata),
    scalar("packageName", Metadata),
    scalar("contractEnforced", Metadata),
    scalar("language", Metadata),
    scalar("group", Metadata),
    scalar("rawCode", Code),
];

/// `ModelNode` as returned by `modelHistoricalRuns`.
pub(crate) const HISTORICAL_RUN_FIELDS: &[FieldSpec] = &[
    scalar("name", Always),
    scalar("alias", Always),
    scalar("description", Always),
    scalar("resourceType", Always),
    scalar("uniqueId", Always),
    scalar("tags", Metadata),
    scalar("meta", Metadata),
    scalar("environmentId", Metadata),
    scalar("projectId", Metadata),
    scalar("accountId", Metadata),
    scalar("owner", Metadata),
    scalar("materializedType", Metadata),
    scalar("runId", RunMetadata),
    scalar("invocationId", RunMetadata),
    scalar("jobId", RunMetadata),
    scalar("threadId", RunMetadata),
    scalar("runGeneratedAt", Timing),
    scalar("compileStartedAt", Timing),
    scalar("compileCompletedAt", Timing),
    scalar("executeStartedAt", Timing),
    scalar("executeCompletedAt", Timing),
    scalar("executionTime", Timing),
    scalar("runElapsedTime", Timing),
    scalar("database", Database),
    scalar("schema", Database),
    scalar("rawSql", Code),
    scalar("compiledSql", Code),
    scalar("rawCode", Code),
    scalar("compiledCode", Code),
    scalar("language", Code),
    scalar("dependsOn", Dependencies),
    object("parentsModels", Dependencies, &["uniqueId", "name"]),
    object("parentsSources", Dependencies, &["uniqueId", "name"]),
    scalar("status", Status),
    scalar("error", Status),
    scalar("skip", Status),
];

/// `ModelNode` under `job { models }`.
pub(crate) const JOB_MODEL_FIELDS: &[FieldSpec] = &[
    scalar("name", Always),
    scalar("uniqueId", Always),
    scalar("description", Always),
    scalar("tags", Always),
    scalar("resourceType", Always),
    scalar("materializedType", Always),
    scalar("database", Database),
    scalar("schema", Database),
    scalar("alias", Database),
    scalar("runId", RunMetadata),
    scalar("jobId", RunMetadata),
    scalar("invocationId", RunMetadata),
    scalar("threadId", RunMetadata),
    scalar("runGeneratedAt", Timing),
    scalar("compileStartedAt", Timing),
    scalar("compileCompletedAt", Timing),
    scalar("executeStartedAt", Timing),
    scalar("executeCompletedAt", Timing),
    scalar("executionTime", Timing),
    scalar("runElapsedTime", Timing),
    scalar("status", Status),
    scalar("error", Status),
    scalar("skip", Status),
    scalar("rawSql", Code),
    scalar("compiledSql", Code),
    scalar("rawCode", Code),
    scalar("compiledCode", Code),
];

/// `TestNode` under `job { tests }`.
pub(crate) const JOB_TEST_FIELDS: &[FieldSpec] = &[
    scalar("name", Always),
    scalar("uniqueId", Always),
    scalar("description", Always),
    scalar("columnName", Always),
    scalar("tags", Always),
    scalar("resourceType", Always),
    scalar("runId", RunMetadata),
    scalar("jobId", RunMetadata),
    scalar("invocationId", RunMetadata),
    scalar("threadId", RunMetadata),
    scalar("runGeneratedAt", Timing),
    scalar("compileStartedAt", Timing),
    scalar("compileCompletedAt", Timing),
    scalar("executeStartedAt", Timing),
    scalar("executeCompletedAt", Timing),
    scalar("executionTime", Timing),
    scalar("runElapsedTime", Timing),
    scalar("status", Status),
    scalar("error", Status),
    scalar("state", Status),
    scalar("warn", Status),
    scalar("fail", Status),
    scalar("skip", Status),
    scalar("rawSql", Code),
    scalar("compiledSql", Code),
    scalar("rawCode", Code),
    scalar("compiledCode", Code),
];

/// Emit the fields of `specs` that `selection` includes, in table order.
pub(crate) fn select_fields(selection: &FieldSelection, specs: &[FieldSpec]) -> Vec<Selection> {
    specs
        .iter()
        .filter(|spec| selection.includes(spec.group))
        .map(|spec| {
            Selection::Field(Field::new(spec.name).scalars(spec.children.iter().copied()))
        })
        .collect()
}

/// Names of the fields `selection` emits from `specs`.
pub(crate) fn selected_names(selection: &FieldSelection, specs: &[FieldSpec]) -> Vec<&'static str> {
    specs
        .iter()
        .filter(|spec| selection.includes(spec.group))
        .map(|spec| spec.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_selection_includes_everything() {
        let selection = FieldSelection::new();
        let names = selected_names(&selection, JOB_MODEL_FIELDS);
        assert_eq!(names.len(), JOB_MODEL_FIELDS.len());
    }

    #[test]
    fn test_explicit_option_excludes_unset_groups() {
        let selection = FieldSelection::new().include_code(true);
        let names = selected_names(&selection, JOB_MODEL_FIELDS);

        assert!(names.contains(&"name"));
        assert!(names.contains(&"uniqueId"));
        assert!(names.contains(&"rawSql"));
        assert!(names.contains(&"compiledSql"));
        assert!(!names.contains(&"database"));
        assert!(!names.contains(&"schema"));
        assert!(!names.contains(&"executionTime"));
        assert!(!names.contains(&"status"));
    }

    #[test]
    fn test_explicit_false_still_counts_as_configured() {
        let selection = FieldSelection::new().include_database(false);
        let names = selected_names(&selection, JOB_MODEL_FIELDS);
        assert!(!names.contains(&"database"));
        assert!(!names.contains(&"runId"));
        assert!(names.contains(&"materializedType"));
    }

    #[test]
    fn test_include_all_overrides_other_options() {
        let selection = FieldSelection::new().include_code(false).include_all(true);
        let names = selected_names(&selection, JOB_TEST_FIELDS);
        assert_eq!(names.len(), JOB_TEST_FIELDS.len());
        assert!(names.contains(&"rawSql"));
    }

    #[test]
    fn test_include_all_false_alone_leaves_only_base_fields() {
        let selection = FieldSelection::new().include_all(false);
        let names = selected_names(&selection, JOB_TEST_FIELDS);
        assert_eq!(
            names,
            vec!["name", "uniqueId", "description", "columnName", "tags", "resourceType"]
        );
    }

    #[test]
    fn test_test_status_group() {
        let selection = FieldSelection::new().include_status(true);
        let names = selected_names(&selection, JOB_TEST_FIELDS);
        for field in ["status", "error", "state", "warn", "fail", "skip"] {
            assert!(names.contains(&field), "missing {field}");
        }
        assert!(!names.contains(&"runId"));
    }

    #[test]
    fn test_object_fields_carry_children() {
        let selection = FieldSelection::new().include_dependencies(true);
        let selections = select_fields(&selection, HISTORICAL_RUN_FIELDS);
        let parents = selections
            .iter()
            .find_map(|s| match s {
                Selection::Field(f) if f.name == "parentsModels" => Some(f),
                _ => None,
            })
            .unwrap();
        assert_eq!(parents.selections.len(), 2);
    }
}
