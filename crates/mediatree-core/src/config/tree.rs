//! Tree engine configuration.

use serde::{Deserialize, Serialize};

/// Locking and naming behavior of the tree engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// How long a mutation waits for its tree locks, in milliseconds.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
    /// How often lock acquisition is re-validated when a node changes tree
    /// while the caller waits for its lock.
    #[serde(default = "default_lock_retry_attempts")]
    pub lock_retry_attempts: u32,
    /// Resolve sibling name collisions by numbering (`false` surfaces
    /// `NameCollision` instead).
    #[serde(default = "default_true")]
    pub auto_rename: bool,
    /// Format of numbered names. Placeholders: `{name}`, `{number}`, `{ext}`.
    #[serde(default = "default_unique_name_format")]
    pub unique_name_format: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout(),
            lock_retry_attempts: default_lock_retry_attempts(),
            auto_rename: true,
            unique_name_format: default_unique_name_format(),
        }
    }
}

fn default_lock_timeout() -> u64 {
    5_000
}

fn default_lock_retry_attempts() -> u32 {
    8
}

fn default_true() -> bool {
    true
}

fn default_unique_name_format() -> String {
    "{name}_{number}{ext}".to_string()
}
