//! Tree-scoped mutation locks.
//!
//! Every structural mutation declares up front which trees it touches and
//! whether it changes the set of top-level nodes. Locks are always taken in
//! the same order (top level first, then trees by ascending id), so two
//! mutations can never wait on each other in a cycle.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::TreeId;

/// The lock scopes a single mutation needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockPlan {
    /// Whether top-level nodes are created, removed, or renamed.
    pub top_level: bool,
    /// Trees whose rows are read or written.
    pub trees: BTreeSet<TreeId>,
}

impl LockPlan {
    /// A plan covering the given trees.
    pub fn trees(trees: impl IntoIterator<Item = TreeId>) -> Self {
        Self {
            top_level: false,
            trees: trees.into_iter().collect(),
        }
    }

    /// Also take the top-level lock.
    pub fn with_top_level(mut self, top_level: bool) -> Self {
        self.top_level |= top_level;
        self
    }

    /// Whether `tree` is covered.
    pub fn covers(&self, tree: TreeId) -> bool {
        self.trees.contains(&tree)
    }
}

/// Held locks. Dropping the guard releases them.
#[derive(Debug)]
pub struct TreeLockGuard {
    _top_level: Option<OwnedMutexGuard<()>>,
    _trees: Vec<OwnedMutexGuard<()>>,
}

/// Registry of per-tree mutexes plus the top-level mutex.
#[derive(Debug)]
pub struct TreeLockManager {
    top_level: Arc<Mutex<()>>,
    trees: DashMap<TreeId, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl TreeLockManager {
    /// Create a manager that gives up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            top_level: Arc::new(Mutex::new(())),
            trees: DashMap::new(),
            timeout,
        }
    }

    /// Acquire every scope in `plan`, failing with `ConcurrentModification`
    /// if the whole set is not held before the timeout elapses.
    pub async fn acquire(&self, plan: &LockPlan) -> AppResult<TreeLockGuard> {
        let deadline = Instant::now() + self.timeout;

        let top_level = if plan.top_level {
            let mutex = Arc::clone(&self.top_level);
            Some(Self::lock_before(mutex, deadline, "top level").await?)
        } else {
            None
        };

        let mut trees = Vec::with_capacity(plan.trees.len());
        for tree in &plan.trees {
            let mutex = Arc::clone(self.trees.entry(*tree).or_default().value());
            trees.push(Self::lock_before(mutex, deadline, &format!("tree {tree}")).await?);
        }

        debug!(top_level = plan.top_level, trees = ?plan.trees, "Tree locks acquired");
        Ok(TreeLockGuard {
            _top_level: top_level,
            _trees: trees,
        })
    }

    async fn lock_before(
        mutex: Arc<Mutex<()>>,
        deadline: Instant,
        scope: &str,
    ) -> AppResult<OwnedMutexGuard<()>> {
        tokio::time::timeout_at(deadline, mutex.lock_owned())
            .await
            .map_err(|_| {
                warn!(scope, "Timed out waiting for tree lock");
                AppError::concurrent_modification(format!(
                    "Timed out waiting for the {scope} lock"
                ))
            })
    }

    /// Drop registry entries for trees that no longer exist and that
    /// nobody is waiting on.
    pub fn forget(&self, trees: impl IntoIterator<Item = TreeId>) {
        for tree in trees {
            self.trees
                .remove_if(&tree, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }

    /// Number of trees with a registered mutex.
    pub fn registered(&self) -> usize {
        self.trees.len()
    }
}
