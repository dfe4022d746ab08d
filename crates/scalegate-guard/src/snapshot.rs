//! Snapshot store — pre-mutation capture for manual rollback.
//!
//! Snapshots are advisory. A failed write never blocks the mutation it
//! precedes, and a failed read is reported as "no snapshot".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use scalegate_state::{Snapshot, StateResult, StateStore, WorkloadSnapshot, WorkloadState};

use crate::outcome::PersistOutcome;

/// Durable storage for snapshots.
pub trait SnapshotBackend: Send + Sync {
    /// Store `snapshot`, retaining at most `keep` entries.
    fn put(&self, snapshot: &Snapshot, keep: usize) -> StateResult<()>;
    fn latest(&self) -> StateResult<Option<Snapshot>>;
    /// Up to `limit` snapshots, newest first.
    fn recent(&self, limit: usize) -> StateResult<Vec<Snapshot>>;
}

impl SnapshotBackend for StateStore {
    fn put(&self, snapshot: &Snapshot, keep: usize) -> StateResult<()> {
        self.put_snapshot(snapshot, keep).map(|_| ())
    }

    fn latest(&self) -> StateResult<Option<Snapshot>> {
        self.latest_snapshot()
    }

    fn recent(&self, limit: usize) -> StateResult<Vec<Snapshot>> {
        self.list_snapshots(limit)
    }
}

/// Capture `workloads` at `captured_at` with synthesized rollback steps.
pub fn capture(workloads: &[WorkloadState], captured_at: DateTime<Utc>) -> Snapshot {
    let workloads: Vec<WorkloadSnapshot> = workloads.iter().map(WorkloadSnapshot::from).collect();
    let steps = workloads
        .iter()
        .map(|w| {
            format!(
                "propose scaling {}/{} back to {} replicas",
                w.namespace, w.name, w.replicas
            )
        })
        .collect::<Vec<_>>()
        .join("; ");
    Snapshot {
        captured_at,
        rollback_instructions: format!("To restore: {steps}."),
        workloads,
    }
}

/// Best-effort snapshot persistence.
#[derive(Clone)]
pub struct SnapshotStore {
    backend: Arc<dyn SnapshotBackend>,
    history: usize,
}

impl SnapshotStore {
    /// `history` is the number of snapshots retained (minimum 1).
    pub fn new(backend: Arc<dyn SnapshotBackend>, history: usize) -> Self {
        Self {
            backend,
            history: history.max(1),
        }
    }

    pub fn save_snapshot(&self, snapshot: &Snapshot) -> PersistOutcome {
        match self.backend.put(snapshot, self.history) {
            Ok(()) => {
                info!(
                    workloads = snapshot.workloads.len(),
                    captured_at = %snapshot.captured_at,
                    "snapshot saved"
                );
                PersistOutcome::Written
            }
            Err(e) => {
                warn!(error = %e, "could not save snapshot");
                PersistOutcome::failed(e)
            }
        }
    }

    pub fn last_snapshot(&self) -> Option<Snapshot> {
        match self.backend.latest() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(error = %e, "could not read snapshot");
                None
            }
        }
    }

    /// Retained snapshots, newest first. Read failures yield an empty list.
    pub fn history(&self) -> Vec<Snapshot> {
        self.backend.recent(self.history).unwrap_or_else(|e| {
            debug!(error = %e, "could not read snapshot history");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scalegate_state::StateError;

    struct BrokenBackend;

    impl SnapshotBackend for BrokenBackend {
        fn put(&self, _: &Snapshot, _: usize) -> StateResult<()> {
            Err(StateError::Write("disk full".to_string()))
        }

        fn latest(&self) -> StateResult<Option<Snapshot>> {
            Err(StateError::Deserialize("truncated".to_string()))
        }

        fn recent(&self, _: usize) -> StateResult<Vec<Snapshot>> {
            Err(StateError::Read("io".to_string()))
        }
    }

    fn workload(replicas: u32) -> WorkloadState {
        WorkloadState {
            namespace: "default".to_string(),
            name: "api".to_string(),
            replicas,
            ready_replicas: replicas,
            available_replicas: replicas,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn capture_synthesizes_rollback_instructions() {
        let snapshot = capture(&[workload(3)], now());
        assert_eq!(snapshot.workloads.len(), 1);
        assert_eq!(snapshot.workloads[0].replicas, 3);
        assert!(snapshot
            .rollback_instructions
            .contains("default/api back to 3 replicas"));
    }

    #[test]
    fn save_then_read_latest() {
        let store = SnapshotStore::new(Arc::new(StateStore::open_in_memory().unwrap()), 1);
        assert!(store.last_snapshot().is_none());

        assert!(store.save_snapshot(&capture(&[workload(3)], now())).is_written());
        assert!(store.save_snapshot(&capture(&[workload(4)], now())).is_written());

        let last = store.last_snapshot().unwrap();
        assert_eq!(last.workloads[0].replicas, 4);
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn failures_are_swallowed() {
        let store = SnapshotStore::new(Arc::new(BrokenBackend), 1);

        let outcome = store.save_snapshot(&capture(&[workload(3)], now()));
        assert!(matches!(
            outcome,
            PersistOutcome::Failed { ref error } if error.contains("disk full")
        ));
        assert!(store.last_snapshot().is_none());
        assert!(store.history().is_empty());
    }
}
