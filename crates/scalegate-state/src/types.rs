//! Domain types persisted by the ScaleGate state store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scalegate_core::{Direction, WorkloadKey};

// ── Workload ──────────────────────────────────────────────────────

/// Replica state of a single workload as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadState {
    pub namespace: String,
    pub name: String,
    /// Desired replica count.
    pub replicas: u32,
    /// Replicas passing readiness checks.
    pub ready_replicas: u32,
    /// Replicas available to serve traffic.
    pub available_replicas: u32,
}

impl WorkloadState {
    pub fn key(&self) -> WorkloadKey {
        WorkloadKey::new(&self.namespace, &self.name)
    }

    /// Build the composite key for the workloads table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

// ── Snapshot ──────────────────────────────────────────────────────

/// Point-in-time capture of workload state taken just before a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub workloads: Vec<WorkloadSnapshot>,
    /// Human-readable steps to restore the captured state.
    pub rollback_instructions: String,
}

/// Pre-mutation replica counts of one workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSnapshot {
    pub namespace: String,
    pub name: String,
    pub replicas: u32,
    pub ready_replicas: u32,
}

impl WorkloadSnapshot {
    pub fn key(&self) -> WorkloadKey {
        WorkloadKey::new(&self.namespace, &self.name)
    }
}

impl From<&WorkloadState> for WorkloadSnapshot {
    fn from(state: &WorkloadState) -> Self {
        Self {
            namespace: state.namespace.clone(),
            name: state.name.clone(),
            replicas: state.replicas,
            ready_replicas: state.ready_replicas,
        }
    }
}

// ── Cooldown ──────────────────────────────────────────────────────

/// The last permitted scaling action for a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub last_action_at: DateTime<Utc>,
    pub last_direction: Direction,
}
