//! `grantflow replay <scenario.json>`: run drafts and reviewer actions
//! through an in-memory engine and show where every request ends up.
//!
//! Nothing is persisted; the scenario file is the whole input.
//!
//! ```json
//! {
//!   "start": "2024-12-01T09:00:00Z",
//!   "requests": [
//!     {
//!       "key": "hr-sync",
//!       "draft": { "selected": ["Sites.Read.All"], ... },
//!       "actions": [
//!         { "action": "approve", "stage": "Business", "actor": "hr.lead", "comments": "ok" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use super::output::{format_timestamp, print_json, print_table, progress_line, status_label};
use super::read_json;
use anyhow::Result;
use chrono::{DateTime, Utc};
use grantflow_workflow::{
    filter, last_denied_at, metrics, stage_progress, ApprovalEngine, ApprovalStage, DateRange, FixedClock,
    Request, RequestFilter, RequestMetrics, RequestStatus, StageProgress, StaticCatalog,
    SubmissionDraft,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Clock start; defaults to now
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requests: Vec<ScenarioRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRequest {
    /// Label used in output; the engine assigns the real id
    pub key: String,
    /// Submission time; defaults to the current clock
    pub submitted_at: Option<DateTime<Utc>>,
    pub draft: SubmissionDraft,
    #[serde(default)]
    pub actions: Vec<ScenarioAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Approve,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAction {
    pub action: ActionKind,
    pub stage: ApprovalStage,
    pub actor: String,
    #[serde(default)]
    pub comments: String,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub requests: Vec<ReplayedRequest>,
    pub rejected_submissions: Vec<RejectedSubmission>,
    pub metrics: RequestMetrics,
}

#[derive(Debug, Serialize)]
pub struct ReplayedRequest {
    pub key: String,
    pub request: Request,
    pub progress: [StageProgress; 3],
    /// Latest denial of each requested permission among earlier requests
    pub denied_earlier: BTreeMap<String, DateTime<Utc>>,
    pub rejected_actions: Vec<RejectedAction>,
}

#[derive(Debug, Serialize)]
pub struct RejectedAction {
    pub action: ScenarioAction,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RejectedSubmission {
    pub key: String,
    pub error: String,
}

/// Apply a scenario and build the report. Rejected submissions and
/// actions are part of the report, not failures of the replay.
pub fn replay(
    catalog: Arc<StaticCatalog>,
    scenario: Scenario,
    view: &RequestFilter,
) -> ReplayReport {
    let clock = Arc::new(FixedClock::new(scenario.start.unwrap_or_else(Utc::now)));
    let engine = ApprovalEngine::with_clock(catalog, clock.clone());

    let mut replayed = Vec::new();
    let mut rejected_submissions = Vec::new();

    for entry in scenario.requests {
        if let Some(at) = entry.submitted_at {
            clock.set(at);
        }
        let id = match engine.submit(entry.draft) {
            Ok(request) => request.id,
            Err(err) => {
                rejected_submissions.push(RejectedSubmission {
                    key: entry.key,
                    error: err.to_string(),
                });
                continue;
            }
        };

        let mut rejected_actions = Vec::new();
        for action in entry.actions {
            if let Some(at) = action.at {
                clock.set(at);
            }
            let result = match action.action {
                ActionKind::Approve => {
                    engine.approve(&id, action.stage, &action.actor, &action.comments)
                }
                ActionKind::Deny => engine.deny(&id, action.stage, &action.actor, &action.comments),
            };
            if let Err(err) = result {
                rejected_actions.push(RejectedAction {
                    error: err.to_string(),
                    action,
                });
            }
        }
        replayed.push((entry.key, id, rejected_actions));
    }

    let snapshots = engine.requests();
    let visible: Vec<&Request> = filter(&snapshots, view).collect();
    let requests = replayed
        .into_iter()
        .filter_map(|(key, id, rejected_actions)| {
            let request = visible.iter().find(|r| r.id == id)?;
            Some(ReplayedRequest {
                key,
                progress: stage_progress(request),
                denied_earlier: denied_earlier(&snapshots, request),
                request: (*request).clone(),
                rejected_actions,
            })
        })
        .collect();

    let report = ReplayReport {
        requests,
        rejected_submissions,
        metrics: metrics(&snapshots, &view.date_range),
    };
    info!(
        total = report.metrics.total,
        rejected_submissions = report.rejected_submissions.len(),
        "Replayed scenario"
    );
    report
}

/// Per permission of `request`, when a request created before it that also
/// asked for the permission was last denied.
fn denied_earlier(snapshots: &[Request], request: &Request) -> BTreeMap<String, DateTime<Utc>> {
    let earlier = snapshots
        .iter()
        .filter(|r| r.created_at < request.created_at);
    request
        .permissions()
        .filter_map(|p| last_denied_at(earlier.clone(), p).map(|at| (p.to_string(), at)))
        .collect()
}

pub fn run(
    catalog: Arc<StaticCatalog>,
    scenario_path: &Path,
    view: &RequestFilter,
    json: bool,
) -> Result<()> {
    let scenario: Scenario = read_json(scenario_path)?;
    let report = replay(catalog, scenario, view);

    if json {
        return print_json(&report);
    }

    let rows = report
        .requests
        .iter()
        .map(|r| {
            vec![
                r.key.clone(),
                r.request.id.to_string(),
                status_label(r.request.status),
                progress_line(&r.progress),
                format_timestamp(r.request.created_at),
            ]
        })
        .collect();
    print_table(&["Key", "Request", "Status", "Progress", "Created"], rows);

    for r in &report.requests {
        for (permission, at) in &r.denied_earlier {
            println!(
                "{}: {} denied earlier on {}",
                r.key,
                permission,
                format_timestamp(*at)
            );
        }
        for rejected in &r.rejected_actions {
            println!(
                "{}: {:?} at {} rejected: {}",
                r.key, rejected.action.action, rejected.action.stage, rejected.error
            );
        }
    }
    for rejected in &report.rejected_submissions {
        println!("{}: submission rejected: {}", rejected.key, rejected.error);
    }

    let m = report.metrics;
    println!(
        "Total: {}  Pending: {}  Approved: {}  Denied: {}",
        m.total, m.pending, m.approved, m.denied
    );
    Ok(())
}

/// Build the listing filter from CLI flags.
pub fn view_filter(
    status: Option<RequestStatus>,
    search: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> RequestFilter {
    RequestFilter {
        date_range: DateRange {
            start: from,
            end: to,
        },
        text: search.filter(|s| !s.trim().is_empty()),
        status,
    }
}
