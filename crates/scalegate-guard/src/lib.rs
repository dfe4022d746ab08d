//! scalegate-guard — the Scaling Guardrail Engine.
//!
//! Sits between an autonomous decision-maker and a control plane's replica
//! counts. A proposal either passes every guardrail and is executed, or is
//! returned as a structured rejection.
//!
//! # Decision sequence
//!
//! ```text
//! lookup workload          -> NotFound / UpstreamFailure (no audit)
//! min <= desired <= max    -> PolicyViolation            (audited)
//! desired == current       -> NoChange                   (no side effects)
//! cooldown(direction)      -> CooldownActive             (audited)
//! scale-down rules         -> GuardRejected              (audited)
//! snapshot                 (best-effort)
//! set replicas             -> UpstreamFailure            (audited, no cooldown)
//! record cooldown, audit   -> Scaled
//! ```
//!
//! Decisions for the same workload are serialized end to end; unrelated
//! workloads proceed independently.

pub mod audit;
pub mod clock;
pub mod control_plane;
pub mod cooldown;
pub mod orchestrator;
pub mod outcome;
pub mod snapshot;
pub mod validator;

pub use audit::{AuditEntry, AuditEvent, AuditLedger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use control_plane::{
    ControlPlane, ControlPlaneError, ControlPlaneFuture, ControlPlaneResult, StateControlPlane,
};
pub use cooldown::{CooldownCheck, CooldownTracker, CooldownWindows};
pub use orchestrator::{DEFAULT_REASON, DEFAULT_UPSTREAM_TIMEOUT, Guardrail};
pub use outcome::{
    NoChange, PersistOutcome, Rejection, RejectionKind, RollbackGuidance, ScaleOutcome, Scaled,
};
pub use snapshot::{SnapshotBackend, SnapshotStore};
pub use validator::{RuleViolation, ScaleDownRule, ScaleDownValidator, Validation};
