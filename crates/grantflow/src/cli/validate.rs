//! `grantflow validate <draft.json>`: check a draft before submitting it.

use super::output::print_json;
use super::read_json;
use anyhow::Result;
use grantflow_workflow::{
    ApprovalEngine, StaticCatalog, SubmissionDraft, SubmissionError, SubmissionWarning,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct DraftCheck {
    pub valid: bool,
    pub errors: Vec<String>,
    /// Missing evidence keyed `<permission>-<field>`
    pub evidence: BTreeMap<String, String>,
    pub warnings: Vec<SubmissionWarning>,
}

pub fn check(catalog: Arc<StaticCatalog>, draft: &SubmissionDraft) -> DraftCheck {
    let engine = ApprovalEngine::new(catalog);
    match engine.check_draft(draft) {
        Ok(report) => DraftCheck {
            valid: true,
            errors: Vec::new(),
            evidence: BTreeMap::new(),
            warnings: report.warnings,
        },
        Err(SubmissionError::Invalid { errors, evidence }) => DraftCheck {
            valid: false,
            errors,
            evidence,
            warnings: Vec::new(),
        },
    }
}

/// Returns whether the draft is valid.
pub fn run(catalog: Arc<StaticCatalog>, draft_path: &Path, json: bool) -> Result<bool> {
    let draft: SubmissionDraft = read_json(draft_path)?;
    let result = check(catalog, &draft);

    if json {
        print_json(&result)?;
        return Ok(result.valid);
    }

    if result.valid {
        println!("Draft is valid ({} permissions).", draft.selected.len());
    } else {
        println!("Draft has problems:");
        for error in &result.errors {
            println!("  - {}", error);
        }
        for (field, message) in &result.evidence {
            println!("  - {}: {}", field, message);
        }
    }
    for warning in &result.warnings {
        println!("  warning: {}", warning.message);
    }

    Ok(result.valid)
}
