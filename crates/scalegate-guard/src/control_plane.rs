//! Control plane — the external authority that owns replica counts.
//!
//! The guardrail engine talks to it through [`ControlPlane`], an
//! object-safe trait returning boxed futures so implementations can be
//! swapped for tests. [`StateControlPlane`] is the bundled implementation
//! backed by the redb workloads table.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::info;

use scalegate_core::WorkloadKey;
use scalegate_state::{StateError, StateStore, WorkloadState};

/// Errors reported by a control plane.
#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("control plane unavailable: {0}")]
    Unavailable(String),

    #[error("control plane did not answer within {0:?}")]
    Timeout(Duration),

    #[error("control plane rejected the request: {0}")]
    Rejected(String),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

pub type ControlPlaneResult<T> = Result<T, ControlPlaneError>;

/// Boxed future returned by [`ControlPlane`] methods.
pub type ControlPlaneFuture<'a, T> =
    Pin<Box<dyn Future<Output = ControlPlaneResult<T>> + Send + 'a>>;

/// Read and mutate workload replica counts.
pub trait ControlPlane: Send + Sync {
    /// Current state of a workload, or `None` if it does not exist.
    fn get_workload<'a>(
        &'a self,
        key: &'a WorkloadKey,
    ) -> ControlPlaneFuture<'a, Option<WorkloadState>>;

    /// Set the replica count of an existing workload.
    fn set_replicas<'a>(
        &'a self,
        key: &'a WorkloadKey,
        replicas: u32,
    ) -> ControlPlaneFuture<'a, WorkloadState>;

    fn list_workloads<'a>(
        &'a self,
        namespace: &'a str,
    ) -> ControlPlaneFuture<'a, Vec<WorkloadState>>;
}

/// Control plane over the state store's workloads table.
///
/// Replica changes take effect immediately: ready and available counts
/// follow the new desired count.
#[derive(Clone)]
pub struct StateControlPlane {
    store: StateStore,
}

impl StateControlPlane {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Create or replace a workload at `replicas`.
    pub fn register(&self, key: &WorkloadKey, replicas: u32) -> ControlPlaneResult<WorkloadState> {
        let workload = WorkloadState {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
            replicas,
            ready_replicas: replicas,
            available_replicas: replicas,
        };
        self.store.put_workload(&workload)?;
        info!(deployment = %key, replicas, "workload registered");
        Ok(workload)
    }
}

impl ControlPlane for StateControlPlane {
    fn get_workload<'a>(
        &'a self,
        key: &'a WorkloadKey,
    ) -> ControlPlaneFuture<'a, Option<WorkloadState>> {
        Box::pin(async move { Ok(self.store.get_workload(key)?) })
    }

    fn set_replicas<'a>(
        &'a self,
        key: &'a WorkloadKey,
        replicas: u32,
    ) -> ControlPlaneFuture<'a, WorkloadState> {
        Box::pin(async move {
            let Some(mut workload) = self.store.get_workload(key)? else {
                return Err(ControlPlaneError::Rejected(format!(
                    "deployment {key} not found"
                )));
            };
            workload.replicas = replicas;
            workload.ready_replicas = replicas;
            workload.available_replicas = replicas;
            self.store.put_workload(&workload)?;
            Ok(workload)
        })
    }

    fn list_workloads<'a>(
        &'a self,
        namespace: &'a str,
    ) -> ControlPlaneFuture<'a, Vec<WorkloadState>> {
        Box::pin(async move { Ok(self.store.list_workloads(namespace)?) })
    }
}
