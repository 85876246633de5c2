//! Node table persistence configuration.

use serde::{Deserialize, Serialize};

/// Where the node table is persisted between process runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the JSON snapshot of the node table.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Whether the CLI saves the snapshot after every mutation.
    #[serde(default = "default_true")]
    pub autosave: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            autosave: true,
        }
    }
}

fn default_snapshot_path() -> String {
    "./data/mediatree.json".to_string()
}

fn default_true() -> bool {
    true
}
