//! CLI commands

pub mod catalog;
pub mod output;
pub mod replay;
pub mod validate;

use anyhow::{Context, Result};
use grantflow_workflow::{StaticCatalog, WorkflowConfig};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

/// Load the permission catalog from a TOML config file.
pub fn load_catalog(path: &Path) -> Result<StaticCatalog> {
    let config = WorkflowConfig::load(path)
        .with_context(|| format!("Failed to load catalog config: {}", path.display()))?;
    let catalog = config
        .catalog()
        .with_context(|| format!("Invalid catalog in {}", path.display()))?;
    debug!(path = %path.display(), permissions = catalog.len(), "Loaded permission catalog");
    Ok(catalog)
}

/// Read and parse a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
