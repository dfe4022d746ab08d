//! Scaling policy — the hard limits every proposal is checked against.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Largest reduction, in replicas, a single accepted scale-down may make.
pub const MAX_SCALE_DOWN_STEP: u32 = 1;

/// Validated guardrail policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Inclusive lower bound on any desired replica count.
    pub min_replicas: u32,
    /// Inclusive upper bound on any desired replica count.
    pub max_replicas: u32,
    /// Minimum time after the last action before a scale-up.
    pub scale_up_cooldown: Duration,
    /// Minimum time after the last action before a scale-down.
    pub scale_down_cooldown: Duration,
    /// Utilization ceiling (percent) for scale-down.
    pub max_scale_down_utilization: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_replicas: 2,
            max_replicas: 5,
            scale_up_cooldown: Duration::from_secs(90),
            scale_down_cooldown: Duration::from_secs(180),
            max_scale_down_utilization: 40.0,
        }
    }
}

impl Policy {
    /// Whether `replicas` lies within `[min_replicas, max_replicas]`.
    pub fn within_bounds(&self, replicas: u32) -> bool {
        (self.min_replicas..=self.max_replicas).contains(&replicas)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_replicas == 0 {
            return Err(ConfigError::Policy(
                "max_replicas must be at least 1".to_string(),
            ));
        }
        if self.min_replicas > self.max_replicas {
            return Err(ConfigError::Policy(format!(
                "min_replicas ({}) exceeds max_replicas ({})",
                self.min_replicas, self.max_replicas
            )));
        }
        if self.scale_down_cooldown <= self.scale_up_cooldown {
            return Err(ConfigError::Policy(format!(
                "scale_down_cooldown ({}s) must be longer than scale_up_cooldown ({}s)",
                self.scale_down_cooldown.as_secs(),
                self.scale_up_cooldown.as_secs()
            )));
        }
        if !(0.0..=100.0).contains(&self.max_scale_down_utilization) {
            return Err(ConfigError::Policy(format!(
                "max_scale_down_utilization ({}) must be within 0..=100",
                self.max_scale_down_utilization
            )));
        }
        Ok(())
    }
}
