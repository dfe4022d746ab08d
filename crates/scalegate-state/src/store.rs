//! StateStore — redb-backed persistence for ScaleGate.
//!
//! Provides typed operations over workloads, snapshots, and cooldown
//! records. All values are JSON-serialized into redb's `&[u8]` value
//! columns. The store supports both on-disk and in-memory backends (the
//! latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use scalegate_core::WorkloadKey;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    ///
    /// The parent directory is created if it does not exist.
    pub fn open(path: &Path) -> StateResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Workloads ──────────────────────────────────────────────────

    /// Insert or update a workload's replica state.
    pub fn put_workload(&self, workload: &WorkloadState) -> StateResult<()> {
        let key = workload.table_key();
        let value = serde_json::to_vec(workload).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, replicas = workload.replicas, "workload stored");
        Ok(())
    }

    /// Get a workload by its key.
    pub fn get_workload(&self, key: &WorkloadKey) -> StateResult<Option<WorkloadState>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        match table.get(key.table_key().as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let workload: WorkloadState =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(workload))
            }
            None => Ok(None),
        }
    }

    /// List workloads in a namespace (prefix scan on `{namespace}/`).
    pub fn list_workloads(&self, namespace: &str) -> StateResult<Vec<WorkloadState>> {
        let prefix = format!("{namespace}/");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let workload: WorkloadState =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(workload);
            }
        }
        Ok(results)
    }

    // ── Snapshots ──────────────────────────────────────────────────

    /// Append a snapshot, keeping only the `keep` most recent entries.
    ///
    /// `keep` is clamped to at least 1. Returns the new sequence number.
    pub fn put_snapshot(&self, snapshot: &Snapshot, keep: usize) -> StateResult<u64> {
        let value = serde_json::to_vec(snapshot).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let seq;
        {
            let mut table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
            let existing: Vec<u64> = table
                .iter()
                .map_err(map_err!(Read))?
                .map(|entry| entry.map(|(key, _)| key.value()))
                .collect::<Result<_, _>>()
                .map_err(map_err!(Read))?;

            seq = existing.last().map_or(0, |last| last + 1);
            table
                .insert(seq, value.as_slice())
                .map_err(map_err!(Write))?;

            // Evict the oldest entries beyond the retention window.
            let excess = (existing.len() + 1).saturating_sub(keep.max(1));
            for old in existing.iter().take(excess) {
                table.remove(*old).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(seq, workloads = snapshot.workloads.len(), "snapshot stored");
        Ok(seq)
    }

    /// Get the most recent snapshot, if any.
    pub fn latest_snapshot(&self) -> StateResult<Option<Snapshot>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        match table.last().map_err(map_err!(Read))? {
            Some((_, value)) => {
                let snapshot: Snapshot =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// List up to `limit` snapshots, newest first.
    pub fn list_snapshots(&self, limit: usize) -> StateResult<Vec<Snapshot>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))?.rev().take(limit) {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let snapshot: Snapshot =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(snapshot);
        }
        Ok(results)
    }

    // ── Cooldowns ──────────────────────────────────────────────────

    /// Record the last permitted action for a workload.
    pub fn put_cooldown(&self, key: &WorkloadKey, record: &CooldownRecord) -> StateResult<()> {
        let key = key.table_key();
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, direction = %record.last_direction, "cooldown recorded");
        Ok(())
    }

    /// Get the last permitted action for a workload.
    pub fn get_cooldown(&self, key: &WorkloadKey) -> StateResult<Option<CooldownRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
        match table.get(key.table_key().as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: CooldownRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
