//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating `scalegate.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration {value:?} for {field}")]
    Duration { field: &'static str, value: String },

    #[error("invalid policy: {0}")]
    Policy(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
