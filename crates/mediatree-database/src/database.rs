//! The shared database handle.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use mediatree_core::config::database::DatabaseConfig;
use mediatree_core::config::tree::TreeConfig;
use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;

use crate::locks::{LockPlan, TreeLockManager};
use crate::naming::NamePolicy;
use crate::snapshot::Snapshot;
use crate::table::{NodeTable, TableState};
use crate::transaction::TreeTransaction;

/// Cheaply cloneable handle to the node table and its lock registry.
#[derive(Debug, Clone)]
pub struct Database {
    table: Arc<NodeTable>,
    locks: Arc<TreeLockManager>,
    config: TreeConfig,
}

impl Database {
    /// Create an empty in-memory database.
    pub fn in_memory(config: TreeConfig) -> Self {
        Self::from_table(NodeTable::new(), config)
    }

    /// Open the database from its snapshot, or start empty if the snapshot
    /// file does not exist yet.
    pub async fn open(db_config: &DatabaseConfig, tree_config: TreeConfig) -> AppResult<Self> {
        let path = Path::new(&db_config.snapshot_path);
        match Snapshot::read(path).await? {
            Some(snapshot) => {
                let count = snapshot.nodes.len();
                let table = NodeTable::from_rows(snapshot.nodes)?;
                info!(path = %path.display(), nodes = count, "Node table loaded from snapshot");
                Ok(Self::from_table(table, tree_config))
            }
            None => {
                info!(path = %path.display(), "No snapshot found, starting with an empty node table");
                Ok(Self::in_memory(tree_config))
            }
        }
    }

    fn from_table(table: NodeTable, config: TreeConfig) -> Self {
        Self {
            table: Arc::new(table),
            locks: Arc::new(TreeLockManager::new(Duration::from_millis(
                config.lock_timeout_ms,
            ))),
            config,
        }
    }

    /// Persist the committed state to `path`.
    pub async fn save(&self, path: &Path) -> AppResult<()> {
        let nodes = self.table.ordered_rows().await;
        Snapshot::new(nodes).write(path).await
    }

    /// Tree engine settings.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The configured sibling naming policy.
    pub fn name_policy(&self) -> NamePolicy {
        NamePolicy::from_config(&self.config)
    }

    /// The lock registry.
    pub fn locks(&self) -> &TreeLockManager {
        &self.locks
    }

    pub(crate) fn table(&self) -> &NodeTable {
        &self.table
    }

    /// Number of committed rows.
    pub async fn node_count(&self) -> usize {
        self.table.read().await.len()
    }

    /// Start a transaction over the scopes `plan` derives from the
    /// committed state.
    ///
    /// The plan is computed, its locks acquired, and then the plan is
    /// computed again. If a concurrent commit moved one of the involved
    /// nodes into another tree in between, the locks are released and the
    /// whole sequence is retried up to `lock_retry_attempts` times.
    pub async fn begin<F>(&self, plan: F) -> AppResult<TreeTransaction>
    where
        F: Fn(&TableState) -> AppResult<LockPlan>,
    {
        let attempts = self.config.lock_retry_attempts.max(1);
        for attempt in 1..=attempts {
            let wanted = {
                let state = self.table.read().await;
                plan(&state)?
            };
            let guard = self.locks.acquire(&wanted).await?;
            let state = self.table.read().await;
            if plan(&state)? == wanted {
                return Ok(TreeTransaction::load(
                    Arc::clone(&self.table),
                    wanted,
                    guard,
                    &state,
                ));
            }
            debug!(attempt, "Lock plan changed while waiting; retrying");
        }
        Err(AppError::concurrent_modification(format!(
            "Involved trees kept changing after {attempts} attempts"
        )))
    }
}
