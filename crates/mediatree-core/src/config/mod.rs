//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and `MEDIATREE__`-prefixed environment variables. Each
//! sub-module represents a logical configuration section.

pub mod database;
pub mod logging;
pub mod storage;
pub mod tree;

use serde::{Deserialize, Serialize};

use self::database::DatabaseConfig;
use self::logging::LoggingConfig;
use self::storage::StorageConfig;
use self::tree::TreeConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Node table persistence settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Tree engine settings (locking, naming).
    #[serde(default)]
    pub tree: TreeConfig,
    /// Content storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `config/default`, the optional `config/{env}` overlay and
    /// environment variables prefixed with `MEDIATREE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config/default", env)
    }

    /// Load configuration from an explicit base file.
    pub fn load_from(base: &str, env: &str) -> Result<Self, AppError> {
        let overlay = match base.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{env}"),
            None => env.to_string(),
        };

        let config = ::config::Config::builder()
            .add_source(::config::File::with_name(base).required(false))
            .add_source(::config::File::with_name(&overlay).required(false))
            .add_source(
                ::config::Environment::with_prefix("MEDIATREE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.tree.unique_name_format.contains("{number}") {
            return Err(AppError::configuration(
                "tree.unique_name_format must contain the {number} placeholder",
            ));
        }
        if self.tree.lock_retry_attempts == 0 {
            return Err(AppError::configuration(
                "tree.lock_retry_attempts must be at least 1",
            ));
        }
        match self.storage.provider.as_str() {
            "local" | "memory" => Ok(()),
            other => Err(AppError::configuration(format!(
                "Unknown storage provider '{other}'"
            ))),
        }
    }
}
