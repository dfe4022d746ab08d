//! scalegate-state — embedded state store for ScaleGate.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for workload replica state, pre-mutation snapshots, and
//! per-workload cooldown records.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Workloads and cooldowns are keyed by `{namespace}/{name}`; snapshots are
//! keyed by a monotonically increasing sequence number so the newest entry
//! is always the last key.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
