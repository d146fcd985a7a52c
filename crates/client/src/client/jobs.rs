//! Job-scoped Discovery methods for [`DiscoveryClient`].
//!
//! Every method accepts an optional run id; without one the API answers for
//! the job's latest run.

use crate::client::DiscoveryClient;
use crate::error::{ClientError, Result};
use crate::models::factory::{build, build_list, build_optional};
use crate::models::{JobModelRun, JobNode, JobRunNodes, JobTestRun};
use crate::query::{self, FieldSelection, JobId, RunId};

impl DiscoveryClient {
    /// Job id and resolved run id.
    pub async fn job_metadata(&self, job: JobId, run_id: Option<RunId>) -> Result<JobNode> {
        let node = self.execute(&query::job_metadata(job, run_id)).await?;
        build_optional(node)?.ok_or_else(|| not_found("Job", job, run_id))
    }

    /// Models executed by a job run.
    pub async fn job_models(
        &self,
        job: JobId,
        run_id: Option<RunId>,
        fields: &FieldSelection,
    ) -> Result<Vec<JobModelRun>> {
        let query = query::job_models(job, run_id, fields);
        let node = self.execute(&query).await?;
        build_list(node, &query.dotted_path())
    }

    /// Tests executed by a job run.
    pub async fn job_tests(
        &self,
        job: JobId,
        run_id: Option<RunId>,
        fields: &FieldSelection,
    ) -> Result<Vec<JobTestRun>> {
        let query = query::job_tests(job, run_id, fields);
        let node = self.execute(&query).await?;
        build_list(node, &query.dotted_path())
    }

    /// One model of a job run.
    pub async fn job_model(
        &self,
        job: JobId,
        run_id: Option<RunId>,
        unique_id: &str,
        fields: &FieldSelection,
    ) -> Result<JobModelRun> {
        let node = self
            .execute(&query::job_model(job, run_id, unique_id, fields)?)
            .await?;
        build_optional(node)?.ok_or_else(|| ClientError::NotFound {
            kind: "Model",
            name: unique_id.to_string(),
        })
    }

    /// One test of a job run.
    pub async fn job_test(
        &self,
        job: JobId,
        run_id: Option<RunId>,
        unique_id: &str,
        fields: &FieldSelection,
    ) -> Result<JobTestRun> {
        let node = self
            .execute(&query::job_test(job, run_id, unique_id, fields)?)
            .await?;
        build_optional(node)?.ok_or_else(|| ClientError::NotFound {
            kind: "Test",
            name: unique_id.to_string(),
        })
    }

    /// Job metadata, models and tests in one round trip.
    pub async fn job_models_and_tests(
        &self,
        job: JobId,
        run_id: Option<RunId>,
        fields: &FieldSelection,
    ) -> Result<JobRunNodes> {
        let node = self
            .execute(&query::job_models_and_tests(job, run_id, fields))
            .await?;
        if node.is_null() {
            return Err(not_found("Job", job, run_id));
        }
        build(node)
    }
}

fn not_found(kind: &'static str, job: JobId, run_id: Option<RunId>) -> ClientError {
    let name = match run_id {
        Some(run) => format!("{job} (run {run})"),
        None => job.to_string(),
    };
    ClientError::NotFound { kind, name }
}
