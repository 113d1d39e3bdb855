pub mod app_config;
pub mod config;
pub mod settings;
pub mod types;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use settings::{ReadyThresholds, RunSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("missing required automation setting: {0}")]
    MissingSetting(String),

    #[error("invalid value for automation setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },
}
