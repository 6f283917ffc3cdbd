//! Approval Workflow Engine
//!
//! Owns every request and is the only thing that changes one. A request
//! moves `Pending@Business -> Pending@Technical -> Pending@AM Team ->
//! Approved`, and a denial at any stage ends it as `Denied`.
//!
//! # Concurrency
//!
//! Each request lives behind its own mutex. A transition holds that mutex
//! for the whole read-check-write cycle, so two actions racing on the same
//! request cannot both pass the current-stage check. The outer map lock is
//! only held long enough to find or insert a slot, so actions on different
//! requests run in parallel.
//!
//! A rejected action never touches the request: every precondition is
//! checked before the history is appended to.

use crate::catalog::PermissionCatalog;
use crate::clock::{Clock, SystemClock};
use crate::model::{
    ApprovalStage, HistoryEntry, Outcome, Request, RequestStatus, SubmissionDraft,
};
use crate::validation::{validate_evidence, validate_submission, SubmissionReport};
use grantflow_ids::RequestId;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by `submit`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Submission rejected: {}", list_problems(.errors, .evidence))]
    Invalid {
        /// Selection, access type and justification problems
        errors: Vec<String>,
        /// Missing evidence, keyed `<permission>-<field>`
        evidence: BTreeMap<String, String>,
    },
}

/// Errors raised by `approve` and `deny`. None of them change the request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Request not found: {0}")]
    NotFound(RequestId),

    #[error("Request {id} is already {status}")]
    AlreadyFinalized { id: RequestId, status: RequestStatus },

    #[error("Request {id} is awaiting {current} approval, not {requested}")]
    StageMismatch {
        id: RequestId,
        current: ApprovalStage,
        requested: ApprovalStage,
    },

    #[error("Comments are required to approve or deny a request")]
    EmptyComments,

    #[error("Evidence incomplete for request {id}: {}", list_keys(.fields))]
    EvidenceIncomplete {
        id: RequestId,
        /// Missing fields keyed `<permission>-<field>`
        fields: BTreeMap<String, String>,
    },
}

/// Errors raised when re-admitting a stored request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Request already tracked: {0}")]
    Duplicate(RequestId),

    #[error("Request {id} references unknown permission: {permission}")]
    UnknownPermission { id: RequestId, permission: String },

    #[error("Request {id} has invalid selections: {reason}")]
    InvalidSelections { id: RequestId, reason: String },

    #[error("Request {id} passed {stage} with incomplete evidence: {}", list_keys(.fields))]
    EvidenceIncomplete {
        id: RequestId,
        stage: ApprovalStage,
        /// Missing fields keyed `<permission>-<field>`
        fields: BTreeMap<String, String>,
    },

    #[error("Request {id} has an inconsistent history: {reason}")]
    InconsistentHistory { id: RequestId, reason: String },
}

/// The approval state machine over an in-memory set of requests.
pub struct ApprovalEngine {
    catalog: Arc<dyn PermissionCatalog>,
    clock: Arc<dyn Clock>,
    requests: RwLock<HashMap<RequestId, Arc<Mutex<Request>>>>,
}

impl ApprovalEngine {
    /// Create an engine stamping history with wall-clock time.
    pub fn new(catalog: Arc<dyn PermissionCatalog>) -> Self {
        Self::with_clock(catalog, Arc::new(SystemClock))
    }

    pub fn with_clock(catalog: Arc<dyn PermissionCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            clock,
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Run both validators on a draft without creating anything.
    ///
    /// Returns the submission report (with warnings) when the draft is
    /// acceptable.
    pub fn check_draft(&self, draft: &SubmissionDraft) -> Result<SubmissionReport, SubmissionError> {
        let mut report =
            validate_submission(&draft.selected, &draft.access_types, &draft.justifications);

        let mut unknown: Vec<&str> = draft
            .selected
            .iter()
            .map(String::as_str)
            .filter(|name| self.catalog.lookup(name).is_none())
            .collect();
        unknown.sort_unstable();
        unknown.dedup();
        if !unknown.is_empty() {
            report
                .errors
                .push(format!("unknown permission: {}", unknown.join(", ")));
        }

        let definitions = draft.selected.iter().filter_map(|n| self.catalog.lookup(n));
        let evidence = validate_evidence(definitions, &draft.evidence);

        if report.is_valid() && evidence.is_valid() {
            Ok(report)
        } else {
            Err(SubmissionError::Invalid {
                errors: report.errors,
                evidence: evidence.errors,
            })
        }
    }

    /// Validate a draft and create a pending request at the first stage.
    pub fn submit(&self, draft: SubmissionDraft) -> Result<Request, SubmissionError> {
        let report = match self.check_draft(&draft) {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "Submission rejected");
                return Err(err);
            }
        };
        for warning in &report.warnings {
            info!(permission = %warning.permission, "{}", warning.message);
        }

        let selections = draft.selections();
        let evidence = draft.selected_evidence();
        let created_at = self.clock.now();

        let mut map = self.write_map();
        let id = loop {
            let candidate = RequestId::new();
            if !map.contains_key(&candidate) {
                break candidate;
            }
        };
        let request = Request::new(id.clone(), selections, evidence, created_at);
        map.insert(id, Arc::new(Mutex::new(request.clone())));
        drop(map);

        info!(
            request_id = %request.id,
            permissions = request.selections.len(),
            "Submitted permission request"
        );
        Ok(request)
    }

    /// Record an approval at `stage`, advancing or completing the request.
    pub fn approve(
        &self,
        id: &RequestId,
        stage: ApprovalStage,
        actor: &str,
        comments: &str,
    ) -> Result<Request, WorkflowError> {
        self.transition(id, stage, actor, comments, Outcome::Approved)
    }

    /// Record a denial at `stage`. Denial is final.
    pub fn deny(
        &self,
        id: &RequestId,
        stage: ApprovalStage,
        actor: &str,
        comments: &str,
    ) -> Result<Request, WorkflowError> {
        self.transition(id, stage, actor, comments, Outcome::Denied)
    }

    /// Snapshot of a single request.
    pub fn get(&self, id: &RequestId) -> Option<Request> {
        let slot = self.read_map().get(id).cloned()?;
        let request = lock(&slot).clone();
        Some(request)
    }

    /// Snapshots of every request, oldest first (ties broken by id).
    pub fn requests(&self) -> Vec<Request> {
        let slots: Vec<Arc<Mutex<Request>>> = self.read_map().values().cloned().collect();
        let mut requests: Vec<Request> = slots.iter().map(|slot| lock(slot).clone()).collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        requests
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Re-admit a request held by a storage collaborator.
    ///
    /// The snapshot must select at least one catalogued permission, satisfy
    /// the stage/status/history invariants, and carry complete evidence for
    /// gated permissions once the first stage has approved it.
    pub fn restore(&self, request: Request) -> Result<(), SnapshotError> {
        check_selections(&request).map_err(|reason| SnapshotError::InvalidSelections {
            id: request.id.clone(),
            reason,
        })?;
        for permission in request.permissions() {
            if self.catalog.lookup(permission).is_none() {
                return Err(SnapshotError::UnknownPermission {
                    id: request.id.clone(),
                    permission: permission.to_string(),
                });
            }
        }
        check_history(&request).map_err(|reason| SnapshotError::InconsistentHistory {
            id: request.id.clone(),
            reason,
        })?;

        let first = ApprovalStage::first();
        if request
            .entry_for(first)
            .is_some_and(|entry| entry.outcome == Outcome::Approved)
        {
            let definitions = request.permissions().filter_map(|n| self.catalog.lookup(n));
            let report = validate_evidence(definitions, &request.evidence);
            if !report.is_valid() {
                return Err(SnapshotError::EvidenceIncomplete {
                    id: request.id.clone(),
                    stage: first,
                    fields: report.errors,
                });
            }
        }

        let mut map = self.write_map();
        match map.entry(request.id.clone()) {
            Entry::Occupied(_) => Err(SnapshotError::Duplicate(request.id)),
            Entry::Vacant(slot) => {
                debug!(request_id = %request.id, status = %request.status, "Restored request");
                slot.insert(Arc::new(Mutex::new(request)));
                Ok(())
            }
        }
    }

    fn transition(
        &self,
        id: &RequestId,
        stage: ApprovalStage,
        actor: &str,
        comments: &str,
        outcome: Outcome,
    ) -> Result<Request, WorkflowError> {
        let slot = self
            .read_map()
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))?;
        let mut request = lock(&slot);

        if let Err(err) = self.check_transition(&request, stage, comments, outcome) {
            warn!(request_id = %id, stage = %stage, actor, error = %err, "Rejected {} action", outcome);
            return Err(err);
        }

        request.history.push(HistoryEntry {
            stage,
            outcome,
            actor: actor.to_string(),
            timestamp: self.clock.now(),
            comments: comments.trim().to_string(),
        });

        match (outcome, stage.next()) {
            (Outcome::Denied, _) => request.status = RequestStatus::Denied,
            (Outcome::Approved, None) => request.status = RequestStatus::Approved,
            (Outcome::Approved, Some(next)) => request.current_stage = next,
        }

        info!(
            request_id = %id,
            stage = %stage,
            actor,
            status = %request.status,
            "Stage {}",
            outcome.to_string().to_lowercase()
        );
        Ok(request.clone())
    }

    fn check_transition(
        &self,
        request: &Request,
        stage: ApprovalStage,
        comments: &str,
        outcome: Outcome,
    ) -> Result<(), WorkflowError> {
        if request.status.is_terminal() {
            return Err(WorkflowError::AlreadyFinalized {
                id: request.id.clone(),
                status: request.status,
            });
        }
        if stage != request.current_stage {
            return Err(WorkflowError::StageMismatch {
                id: request.id.clone(),
                current: request.current_stage,
                requested: stage,
            });
        }
        if comments.trim().is_empty() {
            return Err(WorkflowError::EmptyComments);
        }
        // Evidence is gated once, on entry to the pipeline.
        if outcome == Outcome::Approved && stage.is_first() {
            let definitions = request.permissions().filter_map(|n| self.catalog.lookup(n));
            let report = validate_evidence(definitions, &request.evidence);
            if !report.is_valid() {
                return Err(WorkflowError::EvidenceIncomplete {
                    id: request.id.clone(),
                    fields: report.errors,
                });
            }
        }
        Ok(())
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<RequestId, Arc<Mutex<Request>>>> {
        self.requests.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<RequestId, Arc<Mutex<Request>>>> {
        self.requests.write().unwrap_or_else(|p| p.into_inner())
    }
}

fn list_problems(errors: &[String], evidence: &BTreeMap<String, String>) -> String {
    errors
        .iter()
        .cloned()
        .chain(evidence.iter().map(|(key, message)| format!("{key}: {message}")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn list_keys(fields: &BTreeMap<String, String>) -> String {
    fields.keys().cloned().collect::<Vec<_>>().join(", ")
}

fn lock(slot: &Mutex<Request>) -> MutexGuard<'_, Request> {
    // Transitions validate before writing, so a poisoned slot still holds a
    // consistent request.
    slot.lock().unwrap_or_else(|p| p.into_inner())
}

fn check_selections(request: &Request) -> Result<(), String> {
    if request.selections.is_empty() {
        return Err("no permissions selected".to_string());
    }
    for (key, selection) in &request.selections {
        if selection.permission != *key {
            return Err(format!("{} stored under key {}", selection.permission, key));
        }
    }
    Ok(())
}

/// Check the stage/status/history invariants of a request.
fn check_history(request: &Request) -> Result<(), String> {
    let history = &request.history;
    if history.len() > ApprovalStage::ALL.len() {
        return Err(format!("{} history entries for {} stages", history.len(), ApprovalStage::ALL.len()));
    }

    for (entry, expected) in history.iter().zip(ApprovalStage::ALL) {
        if entry.stage != expected {
            return Err(format!("expected {} entry, found {}", expected, entry.stage));
        }
        if entry.comments.trim().is_empty() {
            return Err(format!("{} entry has no comments", entry.stage));
        }
    }

    if let Some(pos) = history.iter().position(|h| h.outcome == Outcome::Denied) {
        if pos + 1 != history.len() {
            return Err(format!("entries recorded after denial at {}", history[pos].stage));
        }
    }

    let expected_status = match history.last() {
        Some(last) if last.outcome == Outcome::Denied => RequestStatus::Denied,
        _ if history.len() == ApprovalStage::ALL.len() => RequestStatus::Approved,
        _ => RequestStatus::Pending,
    };
    if request.status != expected_status {
        return Err(format!("status {} but history implies {}", request.status, expected_status));
    }

    let expected_stage = match (request.status, history.last()) {
        (RequestStatus::Pending, _) => ApprovalStage::ALL[history.len()],
        (_, Some(last)) => last.stage,
        (_, None) => ApprovalStage::first(),
    };
    if request.current_stage != expected_stage {
        return Err(format!(
            "current stage {} but history implies {}",
            request.current_stage, expected_stage
        ));
    }

    Ok(())
}
