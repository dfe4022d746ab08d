//! redb table definitions for the ScaleGate state store.
//!
//! Values are JSON-serialized domain types stored as `&[u8]`.

use redb::TableDefinition;

/// Workload replica state keyed by `{namespace}/{name}`.
pub const WORKLOADS: TableDefinition<&str, &[u8]> = TableDefinition::new("workloads");

/// Pre-mutation snapshots keyed by sequence number (newest = largest).
pub const SNAPSHOTS: TableDefinition<u64, &[u8]> = TableDefinition::new("snapshots");

/// Last permitted scaling action keyed by `{namespace}/{name}`.
pub const COOLDOWNS: TableDefinition<&str, &[u8]> = TableDefinition::new("cooldowns");
