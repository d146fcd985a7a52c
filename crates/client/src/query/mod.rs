//! Query construction for the Discovery GraphQL API.
//!
//! Responsibilities:
//! - Build parameterized query documents for environment, applied-state,
//!   definition-state and job nodes.
//! - Apply field-group selection (`FieldSelection`) per node kind.
//! - Build aliased batch queries for historical model runs.
//!
//! Does NOT handle:
//! - Sending queries (see `endpoints::graphql`).
//! - Interpreting responses (see `normalize` and `models::factory`).
//!
//! Invariants:
//! - Target ids are positive; `EnvironmentId`, `JobId` and `RunId` cannot hold anything else.
//! - Caller-supplied strings only ever travel in the variables object.
//! - A batch query never carries more than `MAX_BATCH_ALIASES` aliases.

mod builders;
mod document;
mod fields;
mod filters;

pub use builders::{
    AppliedModelsRequest, BatchQuery, DefinitionModelsRequest, applied_models,
    applied_state_summary, batch_historical_runs, definition_models, definition_state_summary,
    environment_metadata, job_metadata, job_model, job_models, job_models_and_tests, job_test,
    job_tests, model_historical_runs,
};
pub use document::{BuiltQuery, Field, QueryDocument, Selection};
pub use fields::{FieldGroup, FieldSelection};
pub use filters::{
    AccessLevel, AppliedModelFilter, AppliedRunStatus, DefinitionFilter, ResourceNodeType,
};

use std::fmt;

use crate::error::ClientError;

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw id; zero and negative ids are rejected.
            pub fn new(raw: i64) -> crate::error::Result<Self> {
                if raw <= 0 {
                    return Err(ClientError::InvalidArgument(format!(
                        "{} must be a positive integer, got {raw}",
                        $label
                    )));
                }
                Ok(Self(raw))
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ClientError;

            fn try_from(raw: i64) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }
    };
}

positive_id!(
    /// Primary key of a dbt Cloud environment.
    EnvironmentId,
    "environment id"
);

positive_id!(
    /// dbt Cloud job definition id.
    JobId,
    "job id"
);

positive_id!(
    /// dbt Cloud run id.
    RunId,
    "run id"
);
