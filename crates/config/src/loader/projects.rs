//! Project map file loading.
//!
//! Responsibilities:
//! - Read and parse the optional YAML project map.
//! - Validate that every entry names a positive environment id.
//!
//! Does NOT handle:
//! - Checking that environments exist remotely.
//!
//! Invariants:
//! - A missing file yields an empty map, never an error.
//! - An unreadable or malformed file is an error that names the path.

use std::path::Path;

use super::error::ConfigError;
use crate::types::{ProjectFile, ProjectMap};

/// Load the project map at `path`.
///
/// Returns an empty map when the file does not exist.
pub fn load_project_file(path: &Path) -> Result<ProjectMap, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Project file not found, using empty project map");
        return Ok(ProjectMap::new());
    }

    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::ConfigFileRead {
        path: path.to_path_buf(),
    })?;

    if content.trim().is_empty() {
        return Ok(ProjectMap::new());
    }

    let file: ProjectFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ConfigFileParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    for (name, entry) in &file.projects {
        if entry.prod_env_id <= 0 {
            return Err(ConfigError::InvalidProject {
                name: name.clone(),
                message: format!("prod_env_id must be positive (got {})", entry.prod_env_id),
            });
        }
    }

    tracing::debug!(
        path = %path.display(),
        projects = file.projects.len(),
        "Loaded project file"
    );
    Ok(file.projects)
}
