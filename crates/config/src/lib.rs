//! Configuration management for the dbt Discovery client.
//!
//! This crate provides types and loaders for dbt Cloud connection settings,
//! API credentials and the optional project map file.

pub mod constants;
mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, env_var_or_none, load_project_file};
pub use types::{AuthConfig, Config, ConnectionConfig, ProjectEntry, ProjectFile, ProjectMap};
