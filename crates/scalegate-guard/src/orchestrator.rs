//! Guardrail orchestrator — the single entry point for scaling proposals.
//!
//! A proposal runs through a fixed sequence while the workload's cooldown
//! slot is held: lookup, hard bounds, no-op check, cooldown, scale-down
//! rules, snapshot, mutation, cooldown record, audit. The first terminal
//! condition wins and every branch returns a [`ScaleOutcome`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use scalegate_core::{Direction, Policy, ScalingRequest, WorkloadKey};
use scalegate_state::{Snapshot, StateStore, WorkloadState};

use crate::audit::{AuditEntry, AuditEvent, AuditLedger};
use crate::clock::{Clock, SystemClock};
use crate::control_plane::{
    ControlPlane, ControlPlaneError, ControlPlaneFuture, ControlPlaneResult,
};
use crate::cooldown::{CooldownCheck, CooldownTracker, CooldownWindows};
use crate::outcome::{
    NoChange, Rejection, RejectionKind, RollbackGuidance, ScaleOutcome, Scaled,
};
use crate::snapshot::{SnapshotStore, capture};
use crate::validator::{ScaleDownValidator, Validation};

/// Justification recorded when the caller supplied none.
pub const DEFAULT_REASON: &str = "No reason provided";

/// Default bound on each control-plane call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// The Scaling Guardrail Engine.
pub struct Guardrail {
    policy: Policy,
    validator: ScaleDownValidator,
    cooldowns: CooldownTracker,
    snapshots: SnapshotStore,
    ledger: AuditLedger,
    control_plane: Arc<dyn ControlPlane>,
    clock: Arc<dyn Clock>,
    upstream_timeout: Duration,
}

impl Guardrail {
    /// Build an engine with in-memory cooldown tracking, the system clock
    /// and the default upstream timeout.
    pub fn new(
        policy: Policy,
        control_plane: Arc<dyn ControlPlane>,
        snapshots: SnapshotStore,
        ledger: AuditLedger,
    ) -> Self {
        Self {
            validator: ScaleDownValidator::new(policy.max_scale_down_utilization),
            cooldowns: CooldownTracker::new(CooldownWindows::from(&policy)),
            policy,
            snapshots,
            ledger,
            control_plane,
            clock: Arc::new(SystemClock),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist cooldown records through `store` so they outlive the process.
    pub fn with_cooldown_store(mut self, store: StateStore) -> Self {
        self.cooldowns =
            CooldownTracker::new(CooldownWindows::from(&self.policy)).with_store(store);
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Decide on `request` and, if every guardrail passes, execute it.
    pub async fn scale(&self, request: &ScalingRequest) -> ScaleOutcome {
        let key = &request.workload;
        let desired = request.desired_replicas;

        // Held until the decision is complete.
        let mut cooldown = self.cooldowns.acquire(key).await;

        let workload = match self.bounded(self.control_plane.get_workload(key)).await {
            Ok(Some(workload)) => workload,
            Ok(None) => {
                warn!(deployment = %key, "deployment not found");
                self.cooldowns.release_if_idle(cooldown).await;
                return ScaleOutcome::Rejected(Rejection::new(
                    RejectionKind::NotFound,
                    key,
                    desired,
                    format!(
                        "Deployment '{}' not found in namespace '{}'",
                        key.name, key.namespace
                    ),
                ));
            }
            Err(e) => {
                error!(deployment = %key, error = %e, "could not read deployment");
                return ScaleOutcome::Rejected(Rejection::new(
                    RejectionKind::UpstreamFailure,
                    key,
                    desired,
                    format!("Could not read deployment {key}: {e}"),
                ));
            }
        };
        let current = workload.replicas;

        if let Some(reason) = self.bounds_violation(desired) {
            warn!(deployment = %key, desired, %reason, "scale blocked by policy");
            let audit = self.ledger.append(
                &self
                    .entry(AuditEvent::ScaleBlockedPolicy, key)
                    .replicas(current, desired)
                    .reason(reason.as_str()),
            );
            return ScaleOutcome::Rejected(Rejection {
                audit,
                ..Rejection::new(RejectionKind::PolicyViolation, key, desired, reason)
                    .with_current(current)
            });
        }

        if desired == current {
            debug!(deployment = %key, replicas = current, "no change requested");
            return ScaleOutcome::NoChange(NoChange {
                namespace: key.namespace.clone(),
                deployment: key.name.clone(),
                current_replicas: current,
                desired_replicas: desired,
                message: format!("Deployment already at {current} replicas"),
            });
        }

        let direction = Direction::classify(current, desired);

        let check = cooldown.check(direction, self.clock.now());
        if let CooldownCheck::Active {
            retry_in_seconds,
            last_direction,
            last_action_at,
            ..
        } = check
        {
            let reason = check.reason().unwrap_or_default();
            warn!(deployment = %key, %direction, retry_in_seconds, "scale blocked by cooldown");
            let audit = self.ledger.append(
                &self
                    .entry(AuditEvent::ScaleBlockedCooldown, key)
                    .replicas(current, desired)
                    .reason(reason.as_str())
                    .retry_in(retry_in_seconds),
            );
            return ScaleOutcome::Rejected(Rejection {
                retry_in_seconds: Some(retry_in_seconds),
                last_action: Some(last_direction),
                last_action_at: Some(last_action_at),
                audit,
                ..Rejection::new(RejectionKind::CooldownActive, key, desired, reason)
                    .with_current(current)
            });
        }

        if direction == Direction::Down {
            let validation = self.validator.validate(
                current,
                desired,
                request.utilization_pct,
                request.justification.as_deref(),
            );
            let reason = validation.reason();
            if let (Validation::Rejected(violations), Some(reason)) = (validation, reason) {
                warn!(deployment = %key, %reason, "scale-down blocked by guard");
                let audit = self.ledger.append(
                    &self
                        .entry(AuditEvent::ScaleBlockedGuard, key)
                        .replicas(current, desired)
                        .reason(reason.as_str()),
                );
                return ScaleOutcome::Rejected(Rejection {
                    violations,
                    audit,
                    ..Rejection::new(RejectionKind::GuardRejected, key, desired, reason)
                        .with_current(current)
                });
            }
        }

        let snapshot = self.snapshots.save_snapshot(&self.capture(&workload));
        let justification = justification_or_default(request.justification.as_deref());

        let updated = match self.bounded(self.control_plane.set_replicas(key, desired)).await {
            Ok(updated) => updated,
            Err(e) => {
                error!(deployment = %key, desired, error = %e, "scale mutation failed");
                let reason = format!(
                    "Scaling {key} to {desired} replicas failed: {e}. \
                     Re-query the deployment before retrying."
                );
                let mut entry = self
                    .entry(AuditEvent::ScaleFailedUpstream, key)
                    .replicas(current, desired)
                    .reason(reason.as_str());
                entry.action = Some(direction);
                let audit = self.ledger.append(&entry);
                return ScaleOutcome::Rejected(Rejection {
                    audit,
                    ..Rejection::new(RejectionKind::UpstreamFailure, key, desired, reason)
                        .with_current(current)
                });
            }
        };

        let cooldown_record = cooldown.record(direction, self.clock.now());

        let audit = self.ledger.append(
            &self
                .entry(AuditEvent::ScaleExecuted, key)
                .replicas(current, desired)
                .executed(updated.replicas, direction)
                .reason(justification.as_str()),
        );

        info!(
            deployment = %key,
            %direction,
            previous = current,
            new = updated.replicas,
            "scale executed"
        );

        ScaleOutcome::Scaled(Scaled {
            namespace: key.namespace.clone(),
            deployment: key.name.clone(),
            direction,
            previous_replicas: current,
            new_replicas: updated.replicas,
            change: i64::from(updated.replicas) - i64::from(current),
            reason: justification,
            timestamp: self.clock.now(),
            rollback: RollbackGuidance {
                target_replicas: current,
                instructions: format!(
                    "To undo, propose scaling {key} back to {current} replicas. \
                     Cooldown and scale-down rules still apply."
                ),
            },
            workload: updated,
            snapshot,
            cooldown: cooldown_record,
            audit,
        })
    }

    /// Propose every workload in the latest snapshot back to its captured
    /// replica count. Each proposal passes through the full gate.
    ///
    /// Returns an empty list when no snapshot exists.
    pub async fn rollback(&self, justification: &str) -> Vec<ScaleOutcome> {
        let Some(snapshot) = self.snapshots.last_snapshot() else {
            info!("rollback requested but no snapshot exists");
            return Vec::new();
        };

        let mut outcomes = Vec::with_capacity(snapshot.workloads.len());
        for captured in &snapshot.workloads {
            let request = ScalingRequest::new(captured.key(), captured.replicas)
                .with_justification(justification);
            outcomes.push(self.scale(&request).await);
        }
        outcomes
    }

    /// The last `limit` audit entries, oldest first.
    pub fn recent_history(&self, limit: usize) -> Vec<AuditEntry> {
        self.ledger.recent(limit)
    }

    pub fn last_snapshot(&self) -> Option<Snapshot> {
        self.snapshots.last_snapshot()
    }

    /// Retained snapshots, newest first.
    pub fn snapshot_history(&self) -> Vec<Snapshot> {
        self.snapshots.history()
    }

    pub async fn list_workloads(&self, namespace: &str) -> ControlPlaneResult<Vec<WorkloadState>> {
        self.bounded(self.control_plane.list_workloads(namespace)).await
    }

    fn bounds_violation(&self, desired: u32) -> Option<String> {
        if self.policy.within_bounds(desired) {
            None
        } else if desired < self.policy.min_replicas {
            Some(format!(
                "Cannot scale below minimum of {} replicas",
                self.policy.min_replicas
            ))
        } else {
            Some(format!(
                "Cannot scale above maximum of {} replicas",
                self.policy.max_replicas
            ))
        }
    }

    fn capture(&self, workload: &WorkloadState) -> Snapshot {
        capture(std::slice::from_ref(workload), self.clock.now())
    }

    fn entry(&self, event: AuditEvent, key: &WorkloadKey) -> AuditEntry {
        AuditEntry::new(self.clock.now(), event, key)
    }

    async fn bounded<T>(&self, call: ControlPlaneFuture<'_, T>) -> ControlPlaneResult<T> {
        match tokio::time::timeout(self.upstream_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ControlPlaneError::Timeout(self.upstream_timeout)),
        }
    }
}

fn justification_or_default(justification: Option<&str>) -> String {
    match justification.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => DEFAULT_REASON.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::control_plane::StateControlPlane;
    use chrono::{TimeZone, Utc};

    struct Harness {
        guardrail: Guardrail,
        plane: StateControlPlane,
        clock: Arc<ManualClock>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open_in_memory().unwrap();
        let plane = StateControlPlane::new(store.clone());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let guardrail = Guardrail::new(
            Policy::default(),
            Arc::new(plane.clone()),
            SnapshotStore::new(Arc::new(store.clone()), 1),
            AuditLedger::new(dir.path().join("audit.log")),
        )
        .with_clock(clock.clone())
        .with_cooldown_store(store);
        Harness {
            guardrail,
            plane,
            clock,
            _dir: dir,
        }
    }

    fn api() -> WorkloadKey {
        WorkloadKey::new("default", "api")
    }

    #[tokio::test]
    async fn unknown_workload_is_not_found_without_audit() {
        let h = harness();
        let outcome = h.guardrail.scale(&ScalingRequest::new(api(), 3)).await;
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::NotFound));
        assert!(h.guardrail.recent_history(10).is_empty());
        assert_eq!(h.guardrail.cooldowns.tracked().await, 0);
    }

    #[tokio::test]
    async fn bounds_are_checked_before_no_op() {
        let h = harness();
        h.plane.register(&api(), 3).unwrap();

        let outcome = h.guardrail.scale(&ScalingRequest::new(api(), 6)).await;
        let rejection = outcome.rejection().unwrap();
        assert_eq!(rejection.kind, RejectionKind::PolicyViolation);
        assert_eq!(rejection.reason, "Cannot scale above maximum of 5 replicas");
        assert_eq!(
            h.guardrail.recent_history(1)[0].event,
            AuditEvent::ScaleBlockedPolicy
        );
    }

    #[tokio::test]
    async fn scale_up_records_cooldown_and_rollback_guidance() {
        let h = harness();
        h.plane.register(&api(), 3).unwrap();

        let outcome = h.guardrail.scale(&ScalingRequest::new(api(), 4)).await;
        let scaled = outcome.scaled().unwrap();
        assert_eq!(scaled.change, 1);
        assert_eq!(scaled.reason, DEFAULT_REASON);
        assert_eq!(scaled.rollback.target_replicas, 3);
        assert!(scaled.snapshot.is_written());
        assert!(scaled.audit.is_written());
        assert!(scaled.cooldown.is_written());

        h.clock.advance(chrono::Duration::seconds(10));
        let again = h.guardrail.scale(&ScalingRequest::new(api(), 5)).await;
        let rejection = again.rejection().unwrap();
        assert_eq!(rejection.kind, RejectionKind::CooldownActive);
        assert_eq!(rejection.retry_in_seconds, Some(80));
        assert_eq!(rejection.last_action, Some(Direction::Up));
    }

    #[tokio::test]
    async fn rollback_restores_captured_count() {
        let h = harness();
        h.plane.register(&api(), 3).unwrap();
        h.guardrail
            .scale(&ScalingRequest::new(api(), 4).with_justification("traffic spike"))
            .await;

        // Reversing a scale-up is a scale-down; wait out its window.
        h.clock.advance(chrono::Duration::seconds(181));
        let outcomes = h.guardrail.rollback("spike is over").await;
        assert_eq!(outcomes.len(), 1);
        let scaled = outcomes[0].scaled().unwrap();
        assert_eq!(scaled.new_replicas, 3);
        assert_eq!(scaled.direction, Direction::Down);
    }

    #[tokio::test]
    async fn cooldown_slot_survives_for_known_workloads() {
        let h = harness();
        h.plane.register(&api(), 3).unwrap();
        h.guardrail.scale(&ScalingRequest::new(api(), 4)).await;

        for name in ["typo-1", "typo-2", "typo-3"] {
            let missing = WorkloadKey::new("default", name);
            h.guardrail.scale(&ScalingRequest::new(missing, 3)).await;
        }
        assert_eq!(h.guardrail.cooldowns.tracked().await, 1);
    }

    #[test]
    fn bounds_message_names_the_violated_limit() {
        let h = harness();
        assert_eq!(h.guardrail.bounds_violation(3), None);
        assert_eq!(
            h.guardrail.bounds_violation(1).as_deref(),
            Some("Cannot scale below minimum of 2 replicas")
        );
        assert_eq!(
            h.guardrail.bounds_violation(6).as_deref(),
            Some("Cannot scale above maximum of 5 replicas")
        );
    }

    #[tokio::test]
    async fn rollback_without_snapshot_is_empty() {
        let h = harness();
        assert!(h.guardrail.rollback("nothing to undo").await.is_empty());
    }

    #[test]
    fn blank_justification_uses_default() {
        assert_eq!(justification_or_default(None), DEFAULT_REASON);
        assert_eq!(justification_or_default(Some("  ")), DEFAULT_REASON);
        assert_eq!(justification_or_default(Some(" load ")), "load");
    }
}
