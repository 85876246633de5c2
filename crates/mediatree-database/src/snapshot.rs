//! JSON snapshots of the node table.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mediatree_core::error::{AppError, ErrorKind};
use mediatree_core::result::AppResult;
use mediatree_entity::Node;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted form of the node table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
    /// Every row, ordered by tree and left bound.
    pub nodes: Vec<Node>,
}

impl Snapshot {
    /// Wrap rows in a snapshot of the current version.
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            nodes,
        }
    }

    /// Read a snapshot, `None` if the file does not exist.
    pub async fn read(path: &Path) -> AppResult<Option<Self>> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read snapshot {}", path.display()),
                    e,
                ));
            }
        };
        let snapshot: Self = serde_json::from_slice(&raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AppError::new(
                ErrorKind::Serialization,
                format!(
                    "Unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                    snapshot.version
                ),
            ));
        }
        Ok(Some(snapshot))
    }

    /// Write the snapshot atomically: a sibling temp file is written first
    /// and renamed over the target.
    pub async fn write(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to create directory {}", parent.display()),
                        e,
                    )
                })?;
            }
        }
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write snapshot {}", tmp.display()),
                e,
            )
        })?;
        tokio::fs::rename(&tmp, path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to replace snapshot {}", path.display()),
                e,
            )
        })?;
        debug!(path = %path.display(), nodes = self.nodes.len(), "Snapshot written");
        Ok(())
    }
}
