//! Configuration type definitions for the dbt Discovery client.
//!
//! Responsibilities:
//! - Define connection, credential and project map configuration types.
//! - Provide serialization helpers for durations.
//!
//! Does NOT handle:
//! - Loading from files or environment variables (see `loader` module).
//! - Network access of any kind (see the client crate).
//!
//! Invariants:
//! - All secret values use `secrecy::SecretString` so they never reach logs.
//! - Project map entries always carry a positive environment id.

mod auth;
pub(crate) mod connection;
mod projects;

pub use auth::AuthConfig;
pub use connection::{Config, ConnectionConfig};
pub use projects::{ProjectEntry, ProjectFile, ProjectMap};
