//! Permission Grant Approval Workflow
//!
//! Tracks requests for API permission grants through a fixed three-stage
//! approval pipeline:
//!
//! 1. **Business**: does the requesting team need this access?
//! 2. **Technical**: is the grant the narrowest one that works?
//! 3. **AM Team**: access management signs off and grants.
//!
//! A denial at any stage is final. Permissions flagged for review or API scan
//! are *gated*: their evidence (attachments, links, site lists) must be
//! complete before the first stage can approve.
//!
//! # Modules
//!
//! - [`catalog`]: permission reference data
//! - [`validation`]: draft and evidence checks
//! - [`engine`]: the approval state machine
//! - [`query`]: filters, counts and progress views over request snapshots
//! - [`config`]: TOML configuration for the catalog

pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod model;
pub mod query;
pub mod validation;

pub use catalog::{CatalogError, PermissionCatalog, PermissionDefinition, StaticCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, WorkflowConfig};
pub use engine::{ApprovalEngine, SnapshotError, SubmissionError, WorkflowError};
pub use grantflow_ids::RequestId;
pub use model::{
    AccessType, ApprovalStage, EvidenceBundle, HistoryEntry, Outcome, PermissionSelection,
    Request, RequestStatus, SubmissionDraft,
};
pub use query::{
    filter, last_denied_at, metrics, stage_progress, DateRange, RequestFilter, RequestMetrics,
    StageProgress, StageState,
};
pub use validation::{
    evidence_key, validate_evidence, validate_submission, EvidenceField, EvidenceReport,
    SubmissionReport, SubmissionWarning, WarningType,
};
