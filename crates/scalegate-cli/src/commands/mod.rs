use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use tracing::debug;

use scalegate_core::{GuardrailConfig, WorkloadKey};
use scalegate_guard::{AuditLedger, Guardrail, SnapshotStore, StateControlPlane};
use scalegate_state::StateStore;

pub mod history;
pub mod propose;
pub mod register;
pub mod rollback;
pub mod snapshot;
pub mod workloads;

/// Everything a subcommand needs, wired from configuration.
pub struct Context {
    pub config: GuardrailConfig,
    pub plane: StateControlPlane,
    pub guardrail: Guardrail,
}

impl Context {
    pub fn load(config_path: &Path, data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = GuardrailConfig::load_or_default(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        if let Some(dir) = data_dir {
            config.storage.data_dir = dir;
        }
        let policy = config.policy()?;
        let timeout = config.control_plane.timeout()?;

        let db_path = config.storage.state_db_path();
        let store = StateStore::open(&db_path)
            .with_context(|| format!("opening state store {}", db_path.display()))?;
        debug!(path = %db_path.display(), "state store ready");

        let plane = StateControlPlane::new(store.clone());
        let guardrail = Guardrail::new(
            policy,
            Arc::new(plane.clone()),
            SnapshotStore::new(Arc::new(store.clone()), config.storage.snapshot_history),
            AuditLedger::new(config.storage.audit_log_path()),
        )
        .with_cooldown_store(store)
        .with_upstream_timeout(timeout);

        Ok(Self {
            config,
            plane,
            guardrail,
        })
    }

    /// Resolve a deployment name against the configured default namespace.
    pub fn workload(&self, namespace: Option<String>, name: String) -> WorkloadKey {
        let namespace = namespace.unwrap_or_else(|| self.config.control_plane.namespace.clone());
        WorkloadKey::new(namespace, name)
    }
}

pub fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::load(
            &dir.path().join("missing.toml"),
            Some(dir.path().join("data")),
        )
        .unwrap();

        assert_eq!(ctx.guardrail.policy().min_replicas, 2);
        assert_eq!(ctx.guardrail.policy().max_replicas, 5);
        assert!(dir.path().join("data").join("scalegate.redb").exists());

        let key = ctx.workload(None, "api".to_string());
        assert_eq!(key.to_string(), "default/api");
    }

    #[test]
    fn invalid_policy_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("scalegate.toml");
        std::fs::write(&config, "[policy]\nmin_replicas = 6\nmax_replicas = 5\n").unwrap();

        let err = Context::load(&config, Some(dir.path().to_path_buf())).err().unwrap();
        assert!(err.to_string().contains("min_replicas (6) exceeds"), "{err}");
    }
}
