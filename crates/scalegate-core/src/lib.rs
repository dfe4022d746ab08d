pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use config::GuardrailConfig;
pub use error::{ConfigError, ConfigResult};
pub use policy::{MAX_SCALE_DOWN_STEP, Policy};
pub use types::*;
