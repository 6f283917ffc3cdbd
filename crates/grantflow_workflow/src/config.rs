//! Workflow configuration loaded from TOML.
//!
//! ```toml
//! [[permissions]]
//! name = "Sites.Read.All"
//! description = "Read items in all site collections"
//! requires_review = true
//! requires_scan = false
//! ```

use crate::catalog::{CatalogError, PermissionDefinition, StaticCatalog};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid permission catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Main configuration for the workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Permission catalog entries
    #[serde(default)]
    pub permissions: Vec<PermissionDefinition>,
}

impl WorkflowConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the permission catalog described by this config.
    pub fn catalog(&self) -> Result<StaticCatalog, ConfigError> {
        Ok(StaticCatalog::from_definitions(self.permissions.iter().cloned())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PermissionCatalog;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[[permissions]]
name = "User.Read"
description = "Sign in and read user profile"

[[permissions]]
name = "Sites.Read.All"
description = "Read items in all site collections"
requires_review = true
"#;

    #[test]
    fn test_parse_defaults_flags_to_false() {
        let config = WorkflowConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.permissions.len(), 2);
        assert!(!config.permissions[0].requires_review);
        assert!(!config.permissions[0].requires_scan);
        assert!(config.permissions[1].requires_review);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.toml");

        let config = WorkflowConfig::from_toml_str(SAMPLE).unwrap();
        config.save(&path).unwrap();

        let loaded = WorkflowConfig::load(&path).unwrap();
        let catalog = loaded.catalog().unwrap();
        assert!(catalog.lookup("Sites.Read.All").unwrap().is_gated());
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = WorkflowConfig::load(&temp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_duplicate_catalog_entry() {
        let toml = r#"
[[permissions]]
name = "Mail.Read"

[[permissions]]
name = "Mail.Read"
"#;
        let config = WorkflowConfig::from_toml_str(toml).unwrap();
        assert!(matches!(
            config.catalog().unwrap_err(),
            ConfigError::Catalog(CatalogError::Duplicate(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            WorkflowConfig::from_toml_str("permissions = 3").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
