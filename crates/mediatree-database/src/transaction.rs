//! All-or-nothing units of work over locked trees.
//!
//! A transaction loads every row of its locked trees into a private working
//! set. Mutations edit that set; [`TreeTransaction::commit`] writes the
//! changed rows back in one step under the table's write lock. Dropping an
//! uncommitted transaction discards the working set, which is the rollback.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{ContentRef, NodeId, TreeId};
use mediatree_entity::Node;

use crate::locks::{LockPlan, TreeLockGuard};
use crate::naming::NamePolicy;
use crate::nested_set::{self, Rows};
use crate::table::{NodeTable, TableState};

/// Outcome of a committed transaction.
#[derive(Debug, Clone, Default)]
pub struct CommitReport {
    /// Rows written (inserted or updated).
    pub written: usize,
    /// Rows removed.
    pub removed: usize,
    /// Content references no committed row points at anymore.
    pub released: Vec<ContentRef>,
    /// Trees that no longer hold any row.
    pub emptied_trees: Vec<TreeId>,
}

/// A unit of work holding the locks of its [`LockPlan`].
#[derive(Debug)]
pub struct TreeTransaction {
    table: Arc<NodeTable>,
    plan: LockPlan,
    _guard: TreeLockGuard,
    rows: Rows,
    originals: HashMap<NodeId, Node>,
    /// Roots of trees outside the plan, as `(id, name)`. Only loaded when
    /// the plan holds the top-level lock, which keeps them stable.
    foreign_roots: Vec<(NodeId, String)>,
    new_trees: BTreeSet<TreeId>,
}

impl TreeTransaction {
    pub(crate) fn load(
        table: Arc<NodeTable>,
        plan: LockPlan,
        guard: TreeLockGuard,
        state: &TableState,
    ) -> Self {
        let mut rows = Rows::new();
        for tree in &plan.trees {
            for node in state.tree_rows(*tree) {
                rows.insert(node.id, node.clone());
            }
        }
        let foreign_roots = if plan.top_level {
            state
                .roots()
                .into_iter()
                .filter(|root| !plan.covers(root.tree_id))
                .map(|root| (root.id, root.name.clone()))
                .collect()
        } else {
            Vec::new()
        };
        debug!(rows = rows.len(), trees = plan.trees.len(), "Transaction started");
        Self {
            table,
            plan,
            _guard: guard,
            originals: rows.clone(),
            rows,
            foreign_roots,
            new_trees: BTreeSet::new(),
        }
    }

    /// The locks this transaction holds.
    pub fn plan(&self) -> &LockPlan {
        &self.plan
    }

    /// A working row, `NotFound` if it is not in a locked tree.
    pub fn get(&self, id: NodeId) -> AppResult<&Node> {
        self.rows
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))
    }

    /// Mutable access to a working row.
    pub fn get_mut(&mut self, id: NodeId) -> AppResult<&mut Node> {
        self.rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))
    }

    /// Working rows of one tree ordered by left bound.
    pub fn tree_rows(&self, tree: TreeId) -> Vec<&Node> {
        nested_set::tree_order(&self.rows, tree)
    }

    /// Direct children of a working row, ordered by left.
    pub fn children(&self, parent: &Node) -> Vec<&Node> {
        nested_set::children_of(&self.rows, parent)
    }

    /// Names currently used among the children of `parent` (`None` for the
    /// top level), ignoring `exclude`.
    pub fn sibling_names(
        &self,
        parent: Option<NodeId>,
        exclude: Option<NodeId>,
    ) -> AppResult<HashSet<String>> {
        let mut names = HashSet::new();
        match parent {
            Some(parent_id) => {
                let parent = self.get(parent_id)?;
                for child in self.children(parent) {
                    if Some(child.id) != exclude {
                        names.insert(child.name.clone());
                    }
                }
            }
            None => {
                if !self.plan.top_level {
                    return Err(AppError::internal(
                        "Top-level names inspected without the top-level lock",
                    ));
                }
                let local = self
                    .rows
                    .values()
                    .filter(|n| n.parent_id.is_none())
                    .map(|n| (n.id, n.name.clone()));
                for (id, name) in self.foreign_roots.iter().cloned().chain(local) {
                    if Some(id) != exclude {
                        names.insert(name);
                    }
                }
            }
        }
        Ok(names)
    }

    /// The name a node would be stored under among the children of
    /// `parent`. Runs against this transaction's rows, so the answer holds
    /// until commit.
    pub fn unique_name_under(
        &self,
        parent: Option<NodeId>,
        desired: &str,
        is_folder: bool,
        exclude: Option<NodeId>,
        policy: &NamePolicy,
    ) -> AppResult<String> {
        let taken = self.sibling_names(parent, exclude)?;
        policy.resolve(desired, is_folder, &taken)
    }

    /// Allocate a node id from the table.
    pub fn allocate_node_id(&self) -> NodeId {
        self.table.allocate_node_id()
    }

    /// Allocate a new tree. Its rows may be written by this transaction
    /// without a tree lock since no other transaction can know the id.
    /// Requires the top-level lock.
    pub fn allocate_tree(&mut self) -> AppResult<TreeId> {
        if !self.plan.top_level {
            return Err(AppError::internal(
                "New trees require the top-level lock",
            ));
        }
        let tree = self.table.allocate_tree_id();
        self.new_trees.insert(tree);
        Ok(tree)
    }

    /// Add or replace a working row.
    pub fn put(&mut self, node: Node) -> AppResult<()> {
        if !self.is_writable(node.tree_id) {
            return Err(AppError::internal(format!(
                "Tree {} is not locked by this transaction",
                node.tree_id
            )));
        }
        self.rows.insert(node.id, node);
        Ok(())
    }

    /// Remove a working row.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.rows.remove(&id)
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Rows {
        &mut self.rows
    }

    pub(crate) fn rows(&self) -> &Rows {
        &self.rows
    }

    fn is_writable(&self, tree: TreeId) -> bool {
        self.plan.covers(tree) || self.new_trees.contains(&tree)
    }

    /// Write every changed row back to the table.
    ///
    /// Content references held by removed or rewritten rows are reported
    /// as released once no committed row points at them.
    pub async fn commit(self) -> AppResult<CommitReport> {
        if let Some(stray) = self.rows.values().find(|n| !self.is_writable(n.tree_id)) {
            return Err(AppError::internal(format!(
                "Node {} landed in unlocked tree {}",
                stray.id, stray.tree_id
            )));
        }

        let mut report = CommitReport::default();
        let mut candidates: Vec<ContentRef> = Vec::new();
        let mut touched_trees: BTreeSet<TreeId> = self.plan.trees.clone();
        touched_trees.extend(self.new_trees.iter().copied());

        let mut state = self.table.write().await;
        for (id, original) in &self.originals {
            if !self.rows.contains_key(id) {
                state.remove(*id);
                candidates.extend(original.content_refs().into_iter().cloned());
                report.removed += 1;
            }
        }
        for (id, row) in &self.rows {
            match self.originals.get(id) {
                Some(original) if original == row => {}
                original => {
                    if let Some(original) = original {
                        candidates.extend(original.content_refs().into_iter().cloned());
                    }
                    state.upsert(row.clone());
                    report.written += 1;
                }
            }
        }

        let mut seen = HashSet::new();
        report.released = candidates
            .into_iter()
            .filter(|c| state.content_refcount(c) == 0 && seen.insert(c.clone()))
            .collect();
        report.emptied_trees = touched_trees
            .into_iter()
            .filter(|tree| state.tree_rows(*tree).next().is_none())
            .collect();
        drop(state);

        debug!(
            written = report.written,
            removed = report.removed,
            released = report.released.len(),
            "Transaction committed"
        );
        Ok(report)
    }
}
