//! Read-only views over request snapshots: filtering, counts, and the
//! per-stage progress shown next to each request.

use crate::model::{ApprovalStage, Outcome, Request, RequestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation-time window. Both bounds are inclusive; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

/// Conjunctive filter over requests. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    #[serde(default)]
    pub date_range: DateRange,
    /// Case-insensitive substring of the request id
    pub text: Option<String>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, request: &Request) -> bool {
        self.date_range.contains(request.created_at)
            && self.status.map_or(true, |s| request.status == s)
            && self.text.as_deref().map_or(true, |q| {
                request
                    .id
                    .as_str()
                    .to_lowercase()
                    .contains(&q.to_lowercase())
            })
    }
}

/// Lazily filter `requests`, preserving their order.
///
/// The returned iterator is `Clone`, so a view can be walked more than once.
pub fn filter<'a>(
    requests: &'a [Request],
    filter: &'a RequestFilter,
) -> impl Iterator<Item = &'a Request> + Clone + 'a {
    requests.iter().filter(move |r| filter.matches(r))
}

/// Request counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetrics {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
}

/// Count requests created within `range`, broken out by status.
pub fn metrics(requests: &[Request], range: &DateRange) -> RequestMetrics {
    requests
        .iter()
        .filter(|r| range.contains(r.created_at))
        .fold(RequestMetrics::default(), |mut m, r| {
            m.total += 1;
            match r.status {
                RequestStatus::Pending => m.pending += 1,
                RequestStatus::Approved => m.approved += 1,
                RequestStatus::Denied => m.denied += 1,
            }
            m
        })
}

/// Where a request stands at one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Completed,
    Denied,
    /// Awaiting action at this stage
    Current,
    Upcoming,
    /// Never reached because an earlier stage denied the request
    NotReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: ApprovalStage,
    pub state: StageState,
}

/// Progress of a request through every stage, in sequence order.
pub fn stage_progress(request: &Request) -> [StageProgress; 3] {
    ApprovalStage::ALL.map(|stage| {
        let state = match request.entry_for(stage) {
            Some(entry) if entry.outcome == Outcome::Denied => StageState::Denied,
            Some(_) => StageState::Completed,
            None if request.status == RequestStatus::Denied => StageState::NotReached,
            None if request.current_stage == stage => StageState::Current,
            None => StageState::Upcoming,
        };
        StageProgress { stage, state }
    })
}

/// Most recent time a request containing `permission` was denied.
pub fn last_denied_at<'a>(
    requests: impl IntoIterator<Item = &'a Request>,
    permission: &str,
) -> Option<DateTime<Utc>> {
    requests
        .into_iter()
        .filter(|r| r.selections.contains_key(permission))
        .filter_map(Request::denied_at)
        .max()
}
