//! Audit ledger — append-only JSON Lines record of scaling decisions.
//!
//! One entry per decision point reached, executed or blocked. Appends are
//! serialized through a process-local lock and written with a single
//! `write_all` per line so concurrent appends never interleave. Readers
//! skip lines that do not parse.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scalegate_core::{Direction, WorkloadKey};

use crate::outcome::PersistOutcome;

/// Kind of decision recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    ScaleExecuted,
    ScaleBlockedCooldown,
    ScaleBlockedGuard,
    ScaleBlockedPolicy,
    ScaleFailedUpstream,
}

/// A single ledger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    pub deployment: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_in_seconds: Option<u64>,
}

impl AuditEntry {
    pub fn new(timestamp: DateTime<Utc>, event: AuditEvent, workload: &WorkloadKey) -> Self {
        Self {
            timestamp,
            event,
            deployment: workload.name.clone(),
            namespace: workload.namespace.clone(),
            requested_replicas: None,
            previous_replicas: None,
            new_replicas: None,
            action: None,
            reason: None,
            retry_in_seconds: None,
        }
    }

    pub fn replicas(mut self, previous: u32, requested: u32) -> Self {
        self.previous_replicas = Some(previous);
        self.requested_replicas = Some(requested);
        self
    }

    pub fn executed(mut self, new_replicas: u32, action: Direction) -> Self {
        self.new_replicas = Some(new_replicas);
        self.action = Some(action);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn retry_in(mut self, seconds: u64) -> Self {
        self.retry_in_seconds = Some(seconds);
        self
    }
}

/// File-backed audit ledger.
pub struct AuditLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry` as one line. Failures are logged and reported, never
    /// propagated.
    pub fn append(&self, entry: &AuditEntry) -> PersistOutcome {
        match self.try_append(entry) {
            Ok(()) => {
                debug!(
                    deployment = %entry.deployment,
                    event = ?entry.event,
                    "audit entry appended"
                );
                PersistOutcome::Written
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not append audit entry");
                PersistOutcome::failed(e)
            }
        }
    }

    fn try_append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)
    }

    /// The last `limit` entries in chronological order.
    ///
    /// A missing file yields an empty list; unparseable lines are skipped.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read audit ledger");
                return Vec::new();
            }
        };

        // Lines are parsed as bytes so a torn or non-UTF-8 line only loses itself.
        let entries: Vec<AuditEntry> = contents
            .split(|b| *b == b'\n')
            .filter(|line| !line.trim_ascii().is_empty())
            .filter_map(|line| match serde_json::from_slice(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "skipping unparseable audit line");
                    None
                }
            })
            .collect();

        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn api() -> WorkloadKey {
        WorkloadKey::new("default", "api")
    }

    #[test]
    fn recent_returns_last_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path().join("audit.log"));

        for i in 0..5 {
            let entry = AuditEntry::new(at(i), AuditEvent::ScaleExecuted, &api())
                .replicas(2 + i as u32, 3 + i as u32)
                .executed(3 + i as u32, Direction::Up)
                .reason("load");
            assert!(ledger.append(&entry).is_written());
        }

        let last = ledger.recent(3);
        assert_eq!(last.len(), 3);
        let new: Vec<_> = last.iter().map(|e| e.new_replicas.unwrap()).collect();
        assert_eq!(new, vec![5, 6, 7]);

        assert_eq!(ledger.recent(50).len(), 5);
    }

    #[test]
    fn optional_fields_are_omitted_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path().join("audit.log"));
        let entry = AuditEntry::new(at(0), AuditEvent::ScaleBlockedCooldown, &api())
            .replicas(3, 4)
            .retry_in(42);
        ledger.append(&entry);

        let raw = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(raw.contains("\"event\":\"scale_blocked_cooldown\""));
        assert!(raw.contains("\"retry_in_seconds\":42"));
        assert!(!raw.contains("new_replicas"));
        assert_eq!(ledger.recent(1), vec![entry]);
    }

    #[test]
    fn unparseable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let ledger = AuditLedger::new(&path);

        ledger.append(&AuditEntry::new(at(0), AuditEvent::ScaleExecuted, &api()));
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{not json").unwrap();
            writeln!(file).unwrap();
        }
        ledger.append(&AuditEntry::new(at(1), AuditEvent::ScaleBlockedGuard, &api()));

        let entries = ledger.recent(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].event, AuditEvent::ScaleBlockedGuard);
    }

    #[test]
    fn invalid_utf8_line_does_not_hide_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let ledger = AuditLedger::new(&path);

        ledger.append(&AuditEntry::new(at(0), AuditEvent::ScaleExecuted, &api()));
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"\xff\xfe torn line\n").unwrap();
        }
        ledger.append(&AuditEntry::new(at(1), AuditEvent::ScaleBlockedCooldown, &api()));

        let entries = ledger.recent(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, AuditEvent::ScaleExecuted);
        assert_eq!(entries[1].event, AuditEvent::ScaleBlockedCooldown);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path().join("nothing-here.log"));
        assert!(ledger.recent(10).is_empty());
    }

    #[test]
    fn unwritable_path_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append.
        let ledger = AuditLedger::new(dir.path());
        let outcome = ledger.append(&AuditEntry::new(at(0), AuditEvent::ScaleExecuted, &api()));
        assert!(matches!(outcome, PersistOutcome::Failed { .. }));
    }
}
