//! Shared types used across ScaleGate crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a horizontally-scalable workload (namespace-scoped).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build the composite key used by the state store tables.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Classification of a requested replica change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    None,
}

impl Direction {
    /// Derive the direction of moving from `current` to `desired` replicas.
    pub fn classify(current: u32, desired: u32) -> Self {
        match desired.cmp(&current) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::None => "none",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposal to move a workload to a new replica count.
///
/// The current replica count is deliberately absent: it is always read from
/// the control plane at decision time, never trusted from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRequest {
    pub workload: WorkloadKey,
    pub desired_replicas: u32,
    /// Free-text reason for the change. Mandatory for scale-down.
    pub justification: Option<String>,
    /// Caller-observed utilization (percent) of the workload.
    pub utilization_pct: Option<f64>,
}

impl ScalingRequest {
    pub fn new(workload: WorkloadKey, desired_replicas: u32) -> Self {
        Self {
            workload,
            desired_replicas,
            justification: None,
            utilization_pct: None,
        }
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }

    pub fn with_utilization(mut self, utilization_pct: f64) -> Self {
        self.utilization_pct = Some(utilization_pct);
        self
    }
}
