//! scalegate.toml configuration parser.
//!
//! Every field is defaulted, so an empty file (or no file at all) yields
//! the conservative policy defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::policy::Policy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub policy: PolicyConfig,
    pub storage: StorageConfig,
    pub control_plane: ControlPlaneConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// Cooldown before another scale-up (e.g., "90s").
    pub scale_up_cooldown: String,
    /// Cooldown before another scale-down (e.g., "3m").
    pub scale_down_cooldown: String,
    /// Utilization ceiling (percent) above which scale-down is refused.
    pub max_scale_down_utilization: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_replicas: 2,
            max_replicas: 5,
            scale_up_cooldown: "90s".to_string(),
            scale_down_cooldown: "180s".to_string(),
            max_scale_down_utilization: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Audit ledger file name, relative to `data_dir`.
    pub audit_log: String,
    /// redb database file name, relative to `data_dir`.
    pub state_db: String,
    /// Number of pre-mutation snapshots to retain (1 = single slot).
    pub snapshot_history: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/scalegate"),
            audit_log: "audit.log".to_string(),
            state_db: "scalegate.redb".to_string(),
            snapshot_history: 1,
        }
    }
}

impl StorageConfig {
    pub fn audit_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.audit_log)
    }

    pub fn state_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_db)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Namespace used when a request does not name one.
    pub namespace: String,
    /// Upper bound on a single control-plane call (e.g., "10s").
    pub timeout: String,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            timeout: "10s".to_string(),
        }
    }
}

impl ControlPlaneConfig {
    pub fn timeout(&self) -> ConfigResult<Duration> {
        parse_duration("control_plane.timeout", &self.timeout)
    }
}

impl GuardrailConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the `[policy]` section into a typed [`Policy`].
    pub fn policy(&self) -> ConfigResult<Policy> {
        let p = &self.policy;
        let policy = Policy {
            min_replicas: p.min_replicas,
            max_replicas: p.max_replicas,
            scale_up_cooldown: parse_duration("policy.scale_up_cooldown", &p.scale_up_cooldown)?,
            scale_down_cooldown: parse_duration(
                "policy.scale_down_cooldown",
                &p.scale_down_cooldown,
            )?,
            max_scale_down_utilization: p.max_scale_down_utilization,
        };
        policy.validate()?;
        Ok(policy)
    }
}

/// Parse a duration string like "30s", "5m", "1h" (bare numbers are seconds).
pub fn parse_duration(field: &'static str, s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::Duration {
        field,
        value: s.to_string(),
    };
    let (digits, multiplier) = if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600)
    } else {
        (s, 1)
    };
    let value = digits.trim().parse::<u64>().map_err(|_| invalid())?;
    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = GuardrailConfig::from_toml_str("").unwrap();
        assert_eq!(config, GuardrailConfig::default());

        let policy = config.policy().unwrap();
        assert_eq!(policy.min_replicas, 2);
        assert_eq!(policy.max_replicas, 5);
        assert_eq!(policy.scale_up_cooldown, Duration::from_secs(90));
        assert_eq!(policy.scale_down_cooldown, Duration::from_secs(180));
        assert_eq!(policy.max_scale_down_utilization, 40.0);
    }

    #[test]
    fn parse_partial_sections() {
        let toml_str = r#"
[policy]
max_replicas = 8
scale_down_cooldown = "5m"

[storage]
data_dir = "/tmp/scalegate"
snapshot_history = 4
"#;
        let config = GuardrailConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.policy.max_replicas, 8);
        assert_eq!(config.policy.min_replicas, 2);
        assert_eq!(config.storage.snapshot_history, 4);
        assert_eq!(
            config.storage.audit_log_path(),
            PathBuf::from("/tmp/scalegate/audit.log")
        );
        assert_eq!(
            config.policy().unwrap().scale_down_cooldown,
            Duration::from_secs(300)
        );
        assert_eq!(config.control_plane.namespace, "default");
    }

    #[test]
    fn rejects_inverted_cooldowns() {
        let toml_str = r#"
[policy]
scale_up_cooldown = "5m"
scale_down_cooldown = "60s"
"#;
        let config = GuardrailConfig::from_toml_str(toml_str).unwrap();
        assert!(matches!(config.policy(), Err(ConfigError::Policy(_))));
    }

    #[test]
    fn rejects_bad_duration() {
        let mut config = GuardrailConfig::default();
        config.policy.scale_up_cooldown = "soon".to_string();
        assert!(matches!(
            config.policy(),
            Err(ConfigError::Duration { field: "policy.scale_up_cooldown", .. })
        ));
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("t", "30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("t", "5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("t", "1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("t", "45").unwrap(), Duration::from_secs(45));
        assert!(parse_duration("t", "invalid").is_err());
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = GuardrailConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, GuardrailConfig::default());
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalegate.toml");
        std::fs::write(&path, "[control_plane]\nnamespace = \"scaling-demo\"\ntimeout = \"3s\"\n")
            .unwrap();

        let config = GuardrailConfig::from_file(&path).unwrap();
        assert_eq!(config.control_plane.namespace, "scaling-demo");
        assert_eq!(config.control_plane.timeout().unwrap(), Duration::from_secs(3));
    }
}
