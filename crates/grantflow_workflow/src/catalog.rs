//! Permission catalog: static reference data about grantable permissions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while building a catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Permission name cannot be empty")]
    EmptyName,

    #[error("Duplicate permission in catalog: {0}")]
    Duplicate(String),
}

/// Reference definition of a grantable permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Unique key, e.g. `Mail.Read`
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Needs a governance review before it can be granted
    #[serde(default)]
    pub requires_review: bool,

    /// Needs an API scan of the consuming application
    #[serde(default)]
    pub requires_scan: bool,
}

impl PermissionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            requires_review: false,
            requires_scan: false,
        }
    }

    pub fn with_review(mut self) -> Self {
        self.requires_review = true;
        self
    }

    pub fn with_scan(mut self) -> Self {
        self.requires_scan = true;
        self
    }

    /// Gated permissions need a complete evidence bundle.
    pub fn is_gated(&self) -> bool {
        self.requires_review || self.requires_scan
    }
}

/// Lookup of permission definitions by name.
pub trait PermissionCatalog: Send + Sync {
    fn lookup(&self, name: &str) -> Option<&PermissionDefinition>;

    /// All definitions, in name order.
    fn definitions(&self) -> Vec<&PermissionDefinition>;
}

/// In-memory catalog loaded once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    by_name: BTreeMap<String, PermissionDefinition>,
}

impl StaticCatalog {
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = PermissionDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut by_name = BTreeMap::new();
        for def in definitions {
            let name = def.name.trim().to_string();
            if name.is_empty() {
                return Err(CatalogError::EmptyName);
            }
            if by_name.contains_key(&name) {
                return Err(CatalogError::Duplicate(name));
            }
            by_name.insert(name.clone(), PermissionDefinition { name, ..def });
        }
        Ok(Self { by_name })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl PermissionCatalog for StaticCatalog {
    fn lookup(&self, name: &str) -> Option<&PermissionDefinition> {
        self.by_name.get(name)
    }

    fn definitions(&self) -> Vec<&PermissionDefinition> {
        self.by_name.values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_gating() {
        let catalog = StaticCatalog::from_definitions(vec![
            PermissionDefinition::new("User.Read", "Sign in and read user profile"),
            PermissionDefinition::new("Sites.Read.All", "Read items in all site collections")
                .with_review(),
            PermissionDefinition::new("Mail.Send", "Send mail as any user").with_scan(),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert!(!catalog.lookup("User.Read").unwrap().is_gated());
        assert!(catalog.lookup("Sites.Read.All").unwrap().is_gated());
        assert!(catalog.lookup("Mail.Send").unwrap().is_gated());
        assert!(catalog.lookup("Files.Read").is_none());
    }

    #[test]
    fn test_definitions_in_name_order() {
        let catalog = StaticCatalog::from_definitions(vec![
            PermissionDefinition::new("User.Read", ""),
            PermissionDefinition::new("Mail.Read", ""),
        ])
        .unwrap();
        let names: Vec<_> = catalog.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Mail.Read", "User.Read"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = StaticCatalog::from_definitions(vec![
            PermissionDefinition::new("Mail.Read", "a"),
            PermissionDefinition::new(" Mail.Read ", "b"),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::Duplicate("Mail.Read".into()));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = StaticCatalog::from_definitions(vec![PermissionDefinition::new("  ", "x")])
            .unwrap_err();
        assert_eq!(err, CatalogError::EmptyName);
    }
}
