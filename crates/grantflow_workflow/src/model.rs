//! Request data model.
//!
//! A [`Request`] is an immutable snapshot as far as callers are concerned:
//! the engine hands out clones and only ever mutates its own copy under the
//! per-request lock.

use chrono::{DateTime, Utc};
use grantflow_ids::RequestId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed approval checkpoints, in the order a request must pass them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApprovalStage {
    Business,
    Technical,
    #[serde(rename = "AM Team")]
    AmTeam,
}

impl ApprovalStage {
    /// Every stage in sequence order.
    pub const ALL: [ApprovalStage; 3] = [Self::Business, Self::Technical, Self::AmTeam];

    pub fn first() -> Self {
        Self::ALL[0]
    }

    pub fn last() -> Self {
        Self::ALL[Self::ALL.len() - 1]
    }

    /// Position of this stage in the sequence (0-based).
    pub fn index(self) -> usize {
        match self {
            Self::Business => 0,
            Self::Technical => 1,
            Self::AmTeam => 2,
        }
    }

    /// The stage that follows this one, or `None` for the last stage.
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn is_first(self) -> bool {
        self == Self::first()
    }

    pub fn is_last(self) -> bool {
        self == Self::last()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Business => "Business",
            Self::Technical => "Technical",
            Self::AmTeam => "AM Team",
        }
    }
}

impl fmt::Display for ApprovalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "business" => Ok(Self::Business),
            "technical" => Ok(Self::Technical),
            "amteam" => Ok(Self::AmTeam),
            _ => Err(format!(
                "Unknown approval stage '{}' (expected Business, Technical or AM Team)",
                s
            )),
        }
    }
}

/// Overall status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Denied => "Denied",
        }
    }

    /// Approved and Denied accept no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            _ => Err(format!("Unknown request status '{}'", s)),
        }
    }
}

/// Outcome recorded for a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Approved,
    Denied,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => f.write_str("Approved"),
            Self::Denied => f.write_str("Denied"),
        }
    }
}

/// Kind of grant requested for a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessType {
    Application,
    Delegated,
    /// Both application and delegated access. Valid, but flagged for review.
    Both,
    #[default]
    None,
}

impl AccessType {
    /// Whether any access is actually being requested.
    pub fn is_selected(self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn is_dual(self) -> bool {
        matches!(self, Self::Both)
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Application => "Application",
            Self::Delegated => "Delegated",
            Self::Both => "Both",
            Self::None => "None",
        };
        f.write_str(s)
    }
}

/// One permission requested by a submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSelection {
    pub permission: String,
    pub access_type: AccessType,
    pub justification: String,
}

/// Supporting material for a gated permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Opaque file references; storage belongs to a collaborator.
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub sites: Vec<String>,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachments.push(attachment.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.sites.push(site.into());
        self
    }
}

/// Append-only record of an action taken at a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub stage: ApprovalStage,
    pub outcome: Outcome,
    /// Asserted identity of the approver; not authenticated here.
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub comments: String,
}

/// A permission-grant request moving through the approval stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub status: RequestStatus,
    /// First stage without a history entry while pending; frozen once terminal.
    pub current_stage: ApprovalStage,
    pub selections: BTreeMap<String, PermissionSelection>,
    #[serde(default)]
    pub evidence: BTreeMap<String, EvidenceBundle>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl Request {
    pub(crate) fn new(
        id: RequestId,
        selections: BTreeMap<String, PermissionSelection>,
        evidence: BTreeMap<String, EvidenceBundle>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: RequestStatus::Pending,
            current_stage: ApprovalStage::first(),
            selections,
            evidence,
            history: Vec::new(),
            created_at,
        }
    }

    /// History entry recorded for `stage`, if the stage has been acted on.
    pub fn entry_for(&self, stage: ApprovalStage) -> Option<&HistoryEntry> {
        self.history.iter().find(|h| h.stage == stage)
    }

    /// Names of the requested permissions, in name order.
    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.selections.keys().map(String::as_str)
    }

    /// Timestamp of the terminal denial, if the request was denied.
    pub fn denied_at(&self) -> Option<DateTime<Utc>> {
        match self.history.last() {
            Some(entry) if entry.outcome == Outcome::Denied => Some(entry.timestamp),
            _ => None,
        }
    }
}

/// A draft as assembled by the submission form.
///
/// `selected` preserves the order the submitter picked permissions in, which
/// is also the order problems are reported in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub access_types: BTreeMap<String, AccessType>,
    #[serde(default)]
    pub justifications: BTreeMap<String, String>,
    #[serde(default)]
    pub evidence: BTreeMap<String, EvidenceBundle>,
}

impl SubmissionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a permission with its access type and justification.
    pub fn select(
        mut self,
        permission: impl Into<String>,
        access_type: AccessType,
        justification: impl Into<String>,
    ) -> Self {
        let permission = permission.into();
        if !self.selected.contains(&permission) {
            self.selected.push(permission.clone());
        }
        self.access_types.insert(permission.clone(), access_type);
        self.justifications.insert(permission, justification.into());
        self
    }

    pub fn with_evidence(mut self, permission: impl Into<String>, bundle: EvidenceBundle) -> Self {
        self.evidence.insert(permission.into(), bundle);
        self
    }

    /// Build the per-permission selections. Assumes the draft validated.
    pub(crate) fn selections(&self) -> BTreeMap<String, PermissionSelection> {
        self.selected
            .iter()
            .map(|name| {
                let selection = PermissionSelection {
                    permission: name.clone(),
                    access_type: self.access_types.get(name).copied().unwrap_or_default(),
                    justification: self
                        .justifications
                        .get(name)
                        .map(|j| j.trim().to_string())
                        .unwrap_or_default(),
                };
                (name.clone(), selection)
            })
            .collect()
    }

    /// Evidence restricted to the selected permissions.
    pub(crate) fn selected_evidence(&self) -> BTreeMap<String, EvidenceBundle> {
        self.evidence
            .iter()
            .filter(|(name, _)| self.selected.contains(name))
            .map(|(name, bundle)| (name.clone(), bundle.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_sequence() {
        assert_eq!(ApprovalStage::first(), ApprovalStage::Business);
        assert_eq!(ApprovalStage::Business.next(), Some(ApprovalStage::Technical));
        assert_eq!(ApprovalStage::Technical.next(), Some(ApprovalStage::AmTeam));
        assert_eq!(ApprovalStage::AmTeam.next(), None);
        assert!(ApprovalStage::AmTeam.is_last());
        assert!(ApprovalStage::Business < ApprovalStage::AmTeam);
    }

    #[test]
    fn test_stage_parsing_and_wire_name() {
        assert_eq!("AM Team".parse::<ApprovalStage>().unwrap(), ApprovalStage::AmTeam);
        assert_eq!("am-team".parse::<ApprovalStage>().unwrap(), ApprovalStage::AmTeam);
        assert_eq!("business".parse::<ApprovalStage>().unwrap(), ApprovalStage::Business);
        assert!("Legal".parse::<ApprovalStage>().is_err());
        assert_eq!(
            serde_json::to_string(&ApprovalStage::AmTeam).unwrap(),
            "\"AM Team\""
        );
    }

    #[test]
    fn test_draft_select_keeps_order_and_trims_justification() {
        let draft = SubmissionDraft::new()
            .select("User.Read", AccessType::Delegated, "  sign-in  ")
            .select("Mail.Read", AccessType::Both, "shared mailbox")
            .select("User.Read", AccessType::Application, "daemon");

        assert_eq!(draft.selected, vec!["User.Read", "Mail.Read"]);
        let selections = draft.selections();
        assert_eq!(selections["User.Read"].access_type, AccessType::Application);
        assert_eq!(selections["User.Read"].justification, "daemon");
    }

    #[test]
    fn test_draft_deserializes_with_defaults() {
        let draft: SubmissionDraft = serde_json::from_str(r#"{"selected": ["Mail.Read"]}"#).unwrap();
        assert_eq!(draft.selected.len(), 1);
        assert!(draft.access_types.is_empty());
        assert!(draft.evidence.is_empty());
    }
}
