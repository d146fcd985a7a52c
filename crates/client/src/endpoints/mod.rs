//! HTTP endpoint implementations for the Discovery and REST APIs.

pub mod cloud;
mod graphql;
mod request;

pub use cloud::RestContext;
pub use graphql::execute_query;
pub use request::{RequestLabels, send_request_with_retry};
