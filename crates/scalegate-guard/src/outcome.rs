//! Structured results returned by the guardrail engine.
//!
//! Every branch of a scaling decision produces a [`ScaleOutcome`] value;
//! nothing unwinds past the caller. Best-effort persistence (snapshots,
//! audit entries, cooldown write-through) reports a [`PersistOutcome`] so
//! swallowed failures stay observable.

use chrono::{DateTime, Utc};
use serde::Serialize;

use scalegate_core::{Direction, WorkloadKey};
use scalegate_state::WorkloadState;

use crate::validator::RuleViolation;

/// Result of a best-effort write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    Written,
    /// No write was attempted (no backing store configured, or no decision reached).
    Skipped,
    /// The write failed; the failure was logged and not propagated.
    Failed { error: String },
}

impl PersistOutcome {
    pub fn failed(error: impl std::fmt::Display) -> Self {
        PersistOutcome::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, PersistOutcome::Written)
    }

    /// Whether a write was attempted and failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, PersistOutcome::Failed { .. })
    }
}

/// Machine-readable reason a proposal did not result in a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The workload does not exist.
    NotFound,
    /// The desired count is outside the hard replica bounds.
    PolicyViolation,
    /// Inside the cooldown window for the requested direction.
    CooldownActive,
    /// A scale-down rule failed.
    GuardRejected,
    /// The control plane failed or timed out.
    UpstreamFailure,
}

impl RejectionKind {
    /// Whether the same request may succeed later without changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, RejectionKind::CooldownActive)
    }
}

/// How to undo an executed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackGuidance {
    pub target_replicas: u32,
    pub instructions: String,
}

/// The desired count already matched the current count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoChange {
    pub namespace: String,
    pub deployment: String,
    pub current_replicas: u32,
    pub desired_replicas: u32,
    pub message: String,
}

/// A mutation that was executed by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scaled {
    pub namespace: String,
    pub deployment: String,
    pub direction: Direction,
    pub previous_replicas: u32,
    pub new_replicas: u32,
    /// Signed replica delta (`new - previous`).
    pub change: i64,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub rollback: RollbackGuidance,
    /// Workload state reported by the control plane after the mutation.
    pub workload: WorkloadState,
    pub snapshot: PersistOutcome,
    /// Write-through of the cooldown record.
    pub cooldown: PersistOutcome,
    pub audit: PersistOutcome,
}

/// A proposal that did not result in a mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub namespace: String,
    pub deployment: String,
    pub requested_replicas: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_replicas: Option<u32>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_in_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<RuleViolation>,
    pub audit: PersistOutcome,
}

impl Rejection {
    pub(crate) fn new(
        kind: RejectionKind,
        workload: &WorkloadKey,
        requested_replicas: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            namespace: workload.namespace.clone(),
            deployment: workload.name.clone(),
            requested_replicas,
            current_replicas: None,
            reason: reason.into(),
            retry_in_seconds: None,
            last_action: None,
            last_action_at: None,
            violations: Vec::new(),
            audit: PersistOutcome::Skipped,
        }
    }

    pub(crate) fn with_current(mut self, current_replicas: u32) -> Self {
        self.current_replicas = Some(current_replicas);
        self
    }
}

/// Outcome of a single scaling proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScaleOutcome {
    NoChange(NoChange),
    Scaled(Scaled),
    Rejected(Rejection),
}

impl ScaleOutcome {
    pub fn success(&self) -> bool {
        !matches!(self, ScaleOutcome::Rejected(_))
    }

    /// Short action label: `no_change`, `scaled_up`, `scaled_down`, or `rejected`.
    pub fn action(&self) -> &'static str {
        match self {
            ScaleOutcome::NoChange(_) => "no_change",
            ScaleOutcome::Scaled(s) if s.direction == Direction::Up => "scaled_up",
            ScaleOutcome::Scaled(_) => "scaled_down",
            ScaleOutcome::Rejected(_) => "rejected",
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ScaleOutcome::Rejected(r) => Some(r),
            _ => None,
        }
    }

    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        self.rejection().map(|r| r.kind)
    }

    pub fn scaled(&self) -> Option<&Scaled> {
        match self {
            ScaleOutcome::Scaled(s) => Some(s),
            _ => None,
        }
    }

    /// Flat JSON form with `success` and `action` fields, as handed to a
    /// calling agent. Rejections also carry `retryable`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "serialization_error": e.to_string() })
        });
        if let Some(map) = value.as_object_mut() {
            map.insert("success".to_string(), self.success().into());
            map.insert("action".to_string(), self.action().into());
            if let Some(kind) = self.rejection_kind() {
                map.insert("retryable".to_string(), kind.is_transient().into());
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_change_is_successful() {
        let outcome = ScaleOutcome::NoChange(NoChange {
            namespace: "default".to_string(),
            deployment: "api".to_string(),
            current_replicas: 2,
            desired_replicas: 2,
            message: "already at 2 replicas".to_string(),
        });

        assert!(outcome.success());
        let json = outcome.to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["action"], "no_change");
        assert_eq!(json["outcome"], "no_change");
        assert!(json.get("retryable").is_none());
    }

    #[test]
    fn rejection_serializes_kind_and_omits_empty_fields() {
        let outcome = ScaleOutcome::Rejected(Rejection::new(
            RejectionKind::PolicyViolation,
            &WorkloadKey::new("default", "api"),
            9,
            "Cannot scale above maximum of 5 replicas",
        ));

        assert!(!outcome.success());
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::PolicyViolation));

        let json = outcome.to_json();
        assert_eq!(json["kind"], "policy_violation");
        assert_eq!(json["action"], "rejected");
        assert!(json.get("retry_in_seconds").is_none());
        assert!(json.get("violations").is_none());
        assert_eq!(json["retryable"], false);
    }

    #[test]
    fn cooldown_rejection_is_retryable() {
        let outcome = ScaleOutcome::Rejected(Rejection::new(
            RejectionKind::CooldownActive,
            &WorkloadKey::new("default", "api"),
            4,
            "Cooldown active",
        ));
        assert_eq!(outcome.to_json()["retryable"], true);
    }

    #[test]
    fn only_cooldown_is_transient() {
        assert!(RejectionKind::CooldownActive.is_transient());
        assert!(!RejectionKind::GuardRejected.is_transient());
        assert!(!RejectionKind::PolicyViolation.is_transient());
    }
}
