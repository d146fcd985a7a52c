//! Typed domain entities for both dbt Cloud APIs.
//!
//! Discovery entities are built from normalized nodes through
//! [`factory::build`]; REST payloads decode directly with serde.

pub mod applied;
pub mod cloud;
pub mod definition;
pub mod environment;
pub mod factory;
pub mod historical;
pub mod job;
mod metadata;
pub mod run_status;

pub use applied::{AppliedModel, ExecutionInfo};
pub use cloud::{
    CloudResponse, DbtAccountInfo, DbtAccountResponse, DbtJob, DbtJobResponse, DbtJobSchedule,
    DbtJobSettings, DbtJobTriggers, DbtJobsResponse, DbtRun, DbtRunsResponse,
};
pub use definition::ModelDefinition;
pub use environment::{AppliedStateSummary, DefinitionStateSummary, ProjectMetadata};
pub use factory::Entity;
pub use historical::{ModelHistoricalRun, NodeRef};
pub use job::{
    ExecutionCode, ExecutionTiming, JobModelRun, JobNode, JobRunNodes, JobTestRun, RunIdentity,
};
pub use metadata::ModelMetadata;
pub use run_status::{RunOutcome, RunStatus};
