//! Request validation.
//!
//! Both checks are pure and run eagerly: the caller sees every problem in
//! one pass instead of fixing them one at a time.

use crate::catalog::PermissionDefinition;
use crate::model::{AccessType, EvidenceBundle};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const NO_PERMISSIONS_SELECTED: &str = "no permissions selected";

/// Result of checking a draft's selections and justifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub errors: Vec<String>,

    /// Non-fatal findings surfaced alongside a valid draft
    pub warnings: Vec<SubmissionWarning>,
}

impl SubmissionReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Warning attached to a single permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionWarning {
    pub warning_type: WarningType,
    pub permission: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    /// Application and delegated access requested together
    DualAccess,
}

/// Evidence field of a gated permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceField {
    Attachments,
    Links,
    Sites,
}

impl EvidenceField {
    pub const ALL: [EvidenceField; 3] = [Self::Attachments, Self::Links, Self::Sites];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attachments => "attachments",
            Self::Links => "links",
            Self::Sites => "sites",
        }
    }

    fn missing_message(self) -> &'static str {
        match self {
            Self::Attachments => "Attachment is required",
            Self::Links => "Link is required",
            Self::Sites => "List of sites is required",
        }
    }

    fn is_present(self, bundle: &EvidenceBundle) -> bool {
        let values = match self {
            Self::Attachments => &bundle.attachments,
            Self::Links => &bundle.links,
            Self::Sites => &bundle.sites,
        };
        !values.is_empty()
    }
}

/// Key under which a missing evidence field is reported: `<permission>-<field>`.
pub fn evidence_key(permission: &str, field: EvidenceField) -> String {
    format!("{}-{}", permission, field.as_str())
}

/// Result of the evidence completeness check, keyed by [`evidence_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceReport {
    pub errors: BTreeMap<String, String>,
}

impl EvidenceReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check that something was selected and every selection has an access
/// type and a non-blank justification.
///
/// `AccessType::None` counts as missing: a selected permission must request
/// some kind of access.
pub fn validate_submission(
    selected: &[String],
    access_types: &BTreeMap<String, AccessType>,
    justifications: &BTreeMap<String, String>,
) -> SubmissionReport {
    let mut report = SubmissionReport::default();

    let mut seen = HashSet::new();
    let selected: Vec<&str> = selected
        .iter()
        .map(String::as_str)
        .filter(|name| seen.insert(*name))
        .collect();

    if selected.is_empty() {
        report.errors.push(NO_PERMISSIONS_SELECTED.to_string());
    }

    let missing_types: Vec<&str> = selected
        .iter()
        .copied()
        .filter(|name| !access_types.get(*name).is_some_and(|t| t.is_selected()))
        .collect();
    if !missing_types.is_empty() {
        report
            .errors
            .push(format!("missing access type for: {}", missing_types.join(", ")));
    }

    let missing_justifications: Vec<&str> = selected
        .iter()
        .copied()
        .filter(|name| {
            justifications
                .get(*name)
                .map_or(true, |j| j.trim().is_empty())
        })
        .collect();
    if !missing_justifications.is_empty() {
        report.errors.push(format!(
            "missing justification for: {}",
            missing_justifications.join(", ")
        ));
    }

    for name in &selected {
        if access_types.get(*name).is_some_and(|t| t.is_dual()) {
            report.warnings.push(SubmissionWarning {
                warning_type: WarningType::DualAccess,
                permission: name.to_string(),
                message: format!(
                    "{} requests both Application and Delegated access",
                    name
                ),
            });
        }
    }

    report
}

/// Check evidence completeness for every gated permission.
///
/// Permissions with neither `requires_review` nor `requires_scan` are
/// skipped, however empty their evidence is.
pub fn validate_evidence<'a>(
    definitions: impl IntoIterator<Item = &'a PermissionDefinition>,
    evidence: &BTreeMap<String, EvidenceBundle>,
) -> EvidenceReport {
    let empty = EvidenceBundle::default();
    let mut report = EvidenceReport::default();

    for def in definitions.into_iter().filter(|d| d.is_gated()) {
        let bundle = evidence.get(&def.name).unwrap_or(&empty);
        for field in EvidenceField::ALL {
            if !field.is_present(bundle) {
                report
                    .errors
                    .insert(evidence_key(&def.name, field), field.missing_message().to_string());
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn map<V: Clone>(pairs: &[(&str, V)]) -> BTreeMap<String, V> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_empty_selection() {
        let report = validate_submission(&[], &BTreeMap::new(), &BTreeMap::new());
        assert!(!report.is_valid());
        assert_eq!(report.errors, vec![NO_PERMISSIONS_SELECTED.to_string()]);
    }

    #[test]
    fn test_valid_submission() {
        let report = validate_submission(
            &names(&["User.Read"]),
            &map(&[("User.Read", AccessType::Delegated)]),
            &map(&[("User.Read", "Sign-in for the portal".to_string())]),
        );
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_dual_access_with_blank_justification_names_permission() {
        let report = validate_submission(
            &names(&["Mail.Read"]),
            &map(&[("Mail.Read", AccessType::Both)]),
            &map(&[("Mail.Read", "".to_string())]),
        );
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("justification"));
        assert!(report.errors[0].contains("Mail.Read"));
    }

    #[test]
    fn test_whitespace_justification_is_missing() {
        let report = validate_submission(
            &names(&["Mail.Read"]),
            &map(&[("Mail.Read", AccessType::Application)]),
            &map(&[("Mail.Read", "   \t".to_string())]),
        );
        assert_eq!(report.errors, vec!["missing justification for: Mail.Read".to_string()]);
    }

    #[test]
    fn test_errors_are_aggregated_not_short_circuited() {
        let report = validate_submission(
            &names(&["A", "B", "C"]),
            &map(&[("A", AccessType::Application), ("B", AccessType::None)]),
            &map(&[("A", "ok".to_string())]),
        );
        assert_eq!(
            report.errors,
            vec![
                "missing access type for: B, C".to_string(),
                "missing justification for: B, C".to_string(),
            ]
        );
    }

    #[test]
    fn test_duplicate_selection_reported_once() {
        let report = validate_submission(
            &names(&["A", "A"]),
            &BTreeMap::new(),
            &map(&[("A", "ok".to_string())]),
        );
        assert_eq!(report.errors, vec!["missing access type for: A".to_string()]);
    }

    #[test]
    fn test_dual_access_warning() {
        let report = validate_submission(
            &names(&["Mail.Read"]),
            &map(&[("Mail.Read", AccessType::Both)]),
            &map(&[("Mail.Read", "Daemon and user flows share a mailbox".to_string())]),
        );
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].warning_type, WarningType::DualAccess);
    }

    #[test]
    fn test_ungated_permission_needs_no_evidence() {
        let defs = [PermissionDefinition::new("User.Read", "")];
        let report = validate_evidence(defs.iter(), &BTreeMap::new());
        assert!(report.is_valid());
    }

    #[test]
    fn test_gated_permission_with_empty_bundle_has_three_errors() {
        let defs = [PermissionDefinition::new("Sites.Read.All", "").with_review()];
        let evidence = map(&[("Sites.Read.All", EvidenceBundle::default())]);
        let report = validate_evidence(defs.iter(), &evidence);

        assert_eq!(report.errors.len(), 3);
        assert_eq!(
            report.errors["Sites.Read.All-attachments"],
            "Attachment is required"
        );
        assert_eq!(report.errors["Sites.Read.All-links"], "Link is required");
        assert_eq!(
            report.errors["Sites.Read.All-sites"],
            "List of sites is required"
        );
    }

    #[test]
    fn test_missing_bundle_counts_as_empty() {
        let defs = [PermissionDefinition::new("Mail.Send", "").with_scan()];
        let report = validate_evidence(defs.iter(), &BTreeMap::new());
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_each_missing_field_reported_independently() {
        let defs = [PermissionDefinition::new("Sites.Read.All", "").with_review()];
        let evidence = map(&[(
            "Sites.Read.All",
            EvidenceBundle::new()
                .with_attachment("review.pdf")
                .with_site("contoso.sharepoint.com/sites/hr"),
        )]);
        let report = validate_evidence(defs.iter(), &evidence);
        let keys: Vec<_> = report.errors.keys().cloned().collect();
        assert_eq!(keys, vec!["Sites.Read.All-links".to_string()]);
    }
}
