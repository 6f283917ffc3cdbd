//! `grantflow catalog`: list grantable permissions.

use super::output::{print_json, print_table, yes_no};
use anyhow::Result;
use grantflow_workflow::{PermissionCatalog, StaticCatalog};

pub fn run(catalog: &StaticCatalog, json: bool) -> Result<()> {
    let definitions = catalog.definitions();
    if json {
        return print_json(&definitions);
    }

    if definitions.is_empty() {
        println!("Catalog is empty.");
        return Ok(());
    }

    let rows = definitions
        .iter()
        .map(|d| {
            vec![
                d.name.clone(),
                d.description.clone(),
                yes_no(d.requires_review).to_string(),
                yes_no(d.requires_scan).to_string(),
            ]
        })
        .collect();
    print_table(&["Permission", "Description", "Review", "API Scan"], rows);

    let gated = definitions.iter().filter(|d| d.is_gated()).count();
    println!("{} permissions, {} require evidence", definitions.len(), gated);
    Ok(())
}
