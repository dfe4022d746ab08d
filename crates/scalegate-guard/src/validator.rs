//! Scale-down validator — extra checks before replicas are removed.
//!
//! Every rule is evaluated and every failure is reported, so a caller can
//! correct all problems with a single retry.

use serde::Serialize;

use scalegate_core::MAX_SCALE_DOWN_STEP;

/// Justification that callers substitute when they have none to give.
pub const NO_REASON_SENTINEL: &str = "no reason provided";

/// Individual scale-down rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDownRule {
    Justification,
    Utilization,
    StepSize,
}

/// A failed rule with its explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleViolation {
    pub rule: ScaleDownRule,
    pub message: String,
}

/// Validator verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Allowed,
    Rejected(Vec<RuleViolation>),
}

impl Validation {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Validation::Allowed)
    }

    /// All failure messages joined into one explanation.
    pub fn reason(&self) -> Option<String> {
        match self {
            Validation::Allowed => None,
            Validation::Rejected(violations) => Some(
                violations
                    .iter()
                    .map(|v| v.message.as_str())
                    .collect::<Vec<_>>()
                    .join(" | "),
            ),
        }
    }
}

/// Rule chain applied to reducing changes.
#[derive(Debug, Clone)]
pub struct ScaleDownValidator {
    max_utilization_pct: f64,
}

impl ScaleDownValidator {
    pub fn new(max_utilization_pct: f64) -> Self {
        Self {
            max_utilization_pct,
        }
    }

    /// Validate moving from `current` to `desired` replicas.
    ///
    /// Anything other than a reduction is trivially allowed. Utilization is
    /// optional: when absent, the utilization rule is skipped.
    pub fn validate(
        &self,
        current: u32,
        desired: u32,
        utilization_pct: Option<f64>,
        justification: Option<&str>,
    ) -> Validation {
        if desired >= current {
            return Validation::Allowed;
        }

        let mut violations = Vec::new();

        if !has_justification(justification) {
            violations.push(RuleViolation {
                rule: ScaleDownRule::Justification,
                message: "Scale-down requires an explicit reason explaining why it is safe \
                          to reduce replicas right now."
                    .to_string(),
            });
        }

        // NaN never compares below the ceiling, so it fails too.
        if let Some(pct) = utilization_pct
            && !(pct <= self.max_utilization_pct)
        {
            violations.push(RuleViolation {
                rule: ScaleDownRule::Utilization,
                message: format!(
                    "Scale-down blocked: utilization is at {pct:.1}%. \
                     Must be at or below {:.0}% before scaling down.",
                    self.max_utilization_pct
                ),
            });
        }

        let reduction = current - desired;
        if reduction > MAX_SCALE_DOWN_STEP {
            let floor = current - MAX_SCALE_DOWN_STEP;
            violations.push(RuleViolation {
                rule: ScaleDownRule::StepSize,
                message: format!(
                    "Scale-down blocked: cannot reduce by {reduction} replicas at once. \
                     Maximum reduction per action is {MAX_SCALE_DOWN_STEP} replica. \
                     Target {floor} instead of {desired}."
                ),
            });
        }

        if violations.is_empty() {
            Validation::Allowed
        } else {
            Validation::Rejected(violations)
        }
    }
}

fn has_justification(justification: Option<&str>) -> bool {
    match justification.map(str::trim) {
        None | Some("") => false,
        Some(text) => !text.eq_ignore_ascii_case(NO_REASON_SENTINEL),
    }
}
