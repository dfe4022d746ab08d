//! Cooldown tracker — per-workload record of the last permitted action.
//!
//! Each workload owns a [`WorkloadCooldown`] behind its own async mutex.
//! The orchestrator holds that mutex for a whole decision, so two
//! concurrent proposals for the same workload are serialized and the
//! second one sees the first one's recorded action. Unrelated workloads
//! never contend.
//!
//! The interval checked is the one for the *requested* direction, measured
//! from the last permitted action regardless of that action's direction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use scalegate_core::{Direction, Policy, WorkloadKey};
use scalegate_state::{CooldownRecord, StateStore};

use crate::outcome::PersistOutcome;

/// Minimum intervals between permitted actions, by requested direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownWindows {
    pub scale_up: Duration,
    pub scale_down: Duration,
}

impl CooldownWindows {
    fn required(&self, direction: Direction) -> Option<Duration> {
        match direction {
            Direction::Up => Some(self.scale_up),
            Direction::Down => Some(self.scale_down),
            Direction::None => None,
        }
    }
}

impl From<&Policy> for CooldownWindows {
    fn from(policy: &Policy) -> Self {
        Self {
            scale_up: policy.scale_up_cooldown,
            scale_down: policy.scale_down_cooldown,
        }
    }
}

/// Result of a cooldown check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CooldownCheck {
    /// No prior action, or enough time has passed.
    Ready,
    /// The requested direction is still inside its window.
    Active {
        requested: Direction,
        retry_in_seconds: u64,
        elapsed_seconds: u64,
        required_seconds: u64,
        last_direction: Direction,
        last_action_at: DateTime<Utc>,
    },
}

impl CooldownCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownCheck::Ready)
    }

    /// Human-readable explanation when blocked.
    pub fn reason(&self) -> Option<String> {
        match self {
            CooldownCheck::Ready => None,
            CooldownCheck::Active {
                requested,
                retry_in_seconds,
                elapsed_seconds,
                required_seconds,
                ..
            } => Some(format!(
                "Cooldown active. Last scaling was {elapsed_seconds}s ago. \
                 Minimum wait for scale-{requested}: {required_seconds}s. \
                 Retry in {retry_in_seconds}s."
            )),
        }
    }
}

/// Cooldown state of a single workload.
pub struct WorkloadCooldown {
    key: WorkloadKey,
    windows: CooldownWindows,
    last: Option<CooldownRecord>,
    store: Option<StateStore>,
}

impl WorkloadCooldown {
    /// Whether an action in `direction` may proceed at `now`.
    pub fn check(&self, direction: Direction, now: DateTime<Utc>) -> CooldownCheck {
        let Some(last) = self.last else {
            return CooldownCheck::Ready;
        };
        let Some(required) = self.windows.required(direction) else {
            return CooldownCheck::Ready;
        };

        // A clock that moved backwards counts as no time elapsed.
        let elapsed = (now - last.last_action_at).to_std().unwrap_or_default();
        if elapsed >= required {
            return CooldownCheck::Ready;
        }

        let remaining = required - elapsed;
        let retry_in_seconds = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);

        CooldownCheck::Active {
            requested: direction,
            retry_in_seconds,
            elapsed_seconds: elapsed.as_secs(),
            required_seconds: required.as_secs(),
            last_direction: last.last_direction,
            last_action_at: last.last_action_at,
        }
    }

    /// Record that a mutation in `direction` was executed at `now`.
    ///
    /// The in-memory slot is always updated; the write-through to the
    /// state store is best-effort.
    pub fn record(&mut self, direction: Direction, now: DateTime<Utc>) -> PersistOutcome {
        let record = CooldownRecord {
            last_action_at: now,
            last_direction: direction,
        };
        self.last = Some(record);

        let Some(store) = &self.store else {
            return PersistOutcome::Skipped;
        };
        match store.put_cooldown(&self.key, &record) {
            Ok(()) => PersistOutcome::Written,
            Err(e) => {
                warn!(deployment = %self.key, error = %e, "could not persist cooldown record");
                PersistOutcome::failed(e)
            }
        }
    }
}

/// Exclusive access to one workload's cooldown state.
pub type CooldownGuard = OwnedMutexGuard<WorkloadCooldown>;

/// Registry of per-workload cooldown state.
pub struct CooldownTracker {
    windows: CooldownWindows,
    slots: Mutex<HashMap<WorkloadKey, Arc<Mutex<WorkloadCooldown>>>>,
    store: Option<StateStore>,
}

impl CooldownTracker {
    /// Create an in-memory tracker.
    pub fn new(windows: CooldownWindows) -> Self {
        Self {
            windows,
            slots: Mutex::new(HashMap::new()),
            store: None,
        }
    }

    /// Load and persist cooldown records through `store`.
    pub fn with_store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Lock the cooldown state of `key`, waiting for any in-flight decision
    /// on the same workload to finish.
    pub async fn acquire(&self, key: &WorkloadKey) -> CooldownGuard {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(self.load(key))))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Release `guard` and drop its registry slot when the workload has no
    /// recorded action and no other decision is waiting on it.
    pub async fn release_if_idle(&self, guard: CooldownGuard) {
        let key = guard.key.clone();
        let idle = guard.last.is_none();
        drop(guard);
        if !idle {
            return;
        }

        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get(&key)
            && Arc::strong_count(slot) == 1
        {
            slots.remove(&key);
            debug!(deployment = %key, "idle cooldown slot released");
        }
    }

    /// Number of workloads with a registry slot.
    #[cfg(test)]
    pub(crate) async fn tracked(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Convenience wrapper: check `direction` for `key` at `now`.
    pub async fn check(
        &self,
        key: &WorkloadKey,
        direction: Direction,
        now: DateTime<Utc>,
    ) -> CooldownCheck {
        self.acquire(key).await.check(direction, now)
    }

    /// Convenience wrapper: record an executed action for `key`.
    pub async fn record_action(
        &self,
        key: &WorkloadKey,
        direction: Direction,
        now: DateTime<Utc>,
    ) -> PersistOutcome {
        self.acquire(key).await.record(direction, now)
    }

    fn load(&self, key: &WorkloadKey) -> WorkloadCooldown {
        let last = match &self.store {
            Some(store) => match store.get_cooldown(key) {
                Ok(record) => record,
                Err(e) => {
                    warn!(deployment = %key, error = %e, "could not load cooldown record");
                    None
                }
            },
            None => None,
        };
        debug!(deployment = %key, restored = last.is_some(), "cooldown slot created");
        WorkloadCooldown {
            key: key.clone(),
            windows: self.windows,
            last,
            store: self.store.clone(),
        }
    }
}
