//! Project map file types.
//!
//! The project map is an optional YAML document naming dbt Cloud projects
//! by their production environment:
//!
//! ```yaml
//! projects:
//!   analytics:
//!     prod_env_id: 12345
//!     label: Analytics
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display name to project entry, ordered by name.
pub type ProjectMap = BTreeMap<String, ProjectEntry>;

/// One named project shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    /// Production environment id used for every Discovery query.
    pub prod_env_id: i64,
    /// Optional human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// On-disk shape of the project map file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub projects: ProjectMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_file_parses_entries() {
        let yaml = "projects:\n  analytics:\n    prod_env_id: 42\n    label: Analytics\n  ops:\n    prod_env_id: 7\n";
        let file: ProjectFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.projects.len(), 2);
        assert_eq!(file.projects["analytics"].prod_env_id, 42);
        assert_eq!(file.projects["analytics"].label.as_deref(), Some("Analytics"));
        assert_eq!(file.projects["ops"].label, None);
    }

    #[test]
    fn test_project_file_without_projects_key_is_empty() {
        let file: ProjectFile = serde_yaml::from_str("{}").unwrap();
        assert!(file.projects.is_empty());
    }
}
