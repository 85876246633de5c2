//! The mutation protocol: move, copy, delete, and rebuild.
//!
//! Each operation derives its lock plan from the committed rows, opens a
//! [`TreeTransaction`], recomputes bounds in the working set, and commits
//! once. Any error before the commit leaves the table untouched.

mod rebuild;

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{ContentRef, NodeId, TreeId};
use mediatree_entity::{Node, Placement};

use crate::database::Database;
use crate::locks::LockPlan;
use crate::naming::NamePolicy;
use crate::nested_set::{
    check_bounds, children_of, clone_subtree, close_gap, compact, detach_subtree,
    insertion_bound, open_gap, placement_index, relocate, Rows,
};
use crate::repositories::tree::lookup;
use crate::transaction::{CommitReport, TreeTransaction};

pub use rebuild::RebuildReport;

/// Outcome of a delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteReport {
    /// Selected nodes actually deleted (descendants of other selected
    /// nodes are folded into their ancestor).
    pub deleted_roots: Vec<NodeId>,
    /// Rows removed, descendants included.
    pub removed: usize,
    /// Content no remaining row references. The caller releases it.
    pub released: Vec<ContentRef>,
}

/// Runs structural mutations against the node table.
#[derive(Debug, Clone)]
pub struct MutationEngine {
    db: Database,
}

impl MutationEngine {
    /// Create a new mutation engine.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Move a node and its subtree under `target` (`None` for the top
    /// level) at `placement`.
    ///
    /// Placing a node before or after itself leaves it where it is. The
    /// moved root is renamed if the target already has a child by that
    /// name.
    pub async fn move_node(
        &self,
        id: NodeId,
        target: Option<NodeId>,
        placement: Placement,
        policy: &NamePolicy,
        actor: Option<&str>,
    ) -> AppResult<Node> {
        let mut tx = self
            .db
            .begin(|state| {
                let node = lookup(state, id)?;
                let mut plan = LockPlan::trees([node.tree_id])
                    .with_top_level(node.is_root() || target.is_none());
                if let Some(target) = target {
                    plan.trees.insert(lookup(state, target)?.tree_id);
                }
                Ok(plan)
            })
            .await?;

        let node = tx.get(id)?.clone();
        check_bounds(&node)?;
        if placement.anchor() == Some(id) {
            if node.parent_id == target {
                debug!(node_id = %id, "Move onto itself is a no-op");
                return Ok(node);
            }
            return Err(AppError::invalid_target(format!(
                "Node {id} cannot be placed next to itself under another parent"
            )));
        }
        validate_target(&tx, &node, target, placement, "move")?;

        let name = tx.unique_name_under(target, &node.name, node.is_folder(), Some(id), policy)?;
        let keeps_default = node.is_default && target == node.parent_id;
        let new_tree = match target {
            Some(_) => None,
            None => Some(tx.allocate_tree()?),
        };

        let width = node.width();
        let rows = tx.rows_mut();
        let mut subtree = detach_subtree(rows, &node);
        close_gap(rows, node.tree_id, node.right, width);
        let (tree, at, depth) = landing(rows, target, new_tree, placement, width)?;
        relocate(&mut subtree, tree, at, depth);

        let root = &mut subtree[0];
        root.parent_id = target;
        root.name = name;
        root.is_default = keeps_default;
        root.touch(actor);
        let moved = root.clone();

        for row in subtree {
            tx.put(row)?;
        }
        let report = tx.commit().await?;
        self.forget_trees(&report);

        info!(
            node_id = %id,
            from_tree = %node.tree_id,
            to_tree = %moved.tree_id,
            target = ?target,
            "Node moved"
        );
        Ok(moved)
    }

    /// Copy a node and its subtree under `target`. Copies get fresh ids
    /// and share content references with the originals. Returns the root
    /// of the copy.
    pub async fn copy_node(
        &self,
        id: NodeId,
        target: Option<NodeId>,
        placement: Placement,
        policy: &NamePolicy,
        actor: Option<&str>,
    ) -> AppResult<Node> {
        let mut tx = self
            .db
            .begin(|state| {
                let node = lookup(state, id)?;
                let mut plan = LockPlan::trees([node.tree_id]).with_top_level(target.is_none());
                if let Some(target) = target {
                    plan.trees.insert(lookup(state, target)?.tree_id);
                }
                Ok(plan)
            })
            .await?;

        let node = tx.get(id)?.clone();
        check_bounds(&node)?;
        validate_target(&tx, &node, target, placement, "copy")?;
        let name = tx.unique_name_under(target, &node.name, node.is_folder(), None, policy)?;

        let mut subtree = clone_subtree(tx.rows(), &node);
        let ids: HashMap<NodeId, NodeId> = subtree
            .iter()
            .map(|row| (row.id, tx.allocate_node_id()))
            .collect();
        let now = Utc::now();
        for row in subtree.iter_mut() {
            row.id = ids[&row.id];
            row.parent_id = row.parent_id.and_then(|p| ids.get(&p).copied());
            row.metadata.created_at = now;
            row.metadata.modified_at = now;
            row.metadata.created_by = actor.map(str::to_string);
            row.metadata.modified_by = actor.map(str::to_string);
        }

        let new_tree = match target {
            Some(_) => None,
            None => Some(tx.allocate_tree()?),
        };
        let rows = tx.rows_mut();
        let (tree, at, depth) = landing(rows, target, new_tree, placement, node.width())?;
        relocate(&mut subtree, tree, at, depth);

        let root = &mut subtree[0];
        root.parent_id = target;
        root.name = name;
        root.is_default = false;
        root.touch(actor);
        let copied = root.clone();

        let count = subtree.len();
        for row in subtree {
            tx.put(row)?;
        }
        tx.commit().await?;

        info!(
            source_id = %id,
            copy_id = %copied.id,
            nodes = count,
            target = ?target,
            "Subtree copied"
        );
        Ok(copied)
    }

    /// Delete a node and its whole subtree.
    pub async fn delete(&self, id: NodeId) -> AppResult<DeleteReport> {
        let mut tx = self
            .db
            .begin(|state| {
                let node = lookup(state, id)?;
                Ok(LockPlan::trees([node.tree_id]).with_top_level(node.is_root()))
            })
            .await?;

        let node = tx.get(id)?.clone();
        check_bounds(&node)?;
        let rows = tx.rows_mut();
        let removed = detach_subtree(rows, &node).len();
        close_gap(rows, node.tree_id, node.right, node.width());
        let report = tx.commit().await?;
        self.forget_trees(&report);

        info!(node_id = %id, removed, released = report.released.len(), "Subtree deleted");
        Ok(DeleteReport {
            deleted_roots: vec![id],
            removed,
            released: report.released,
        })
    }

    /// Delete several nodes in one transaction.
    ///
    /// Duplicates and nodes whose ancestor is also selected are skipped.
    /// Bounds are recomputed once per affected tree.
    pub async fn delete_many(&self, ids: &[NodeId]) -> AppResult<DeleteReport> {
        let selected: BTreeSet<NodeId> = ids.iter().copied().collect();
        if selected.is_empty() {
            return Ok(DeleteReport::default());
        }
        let mut tx = self
            .db
            .begin(|state| {
                let mut plan = LockPlan::default();
                for id in &selected {
                    let node = lookup(state, *id)?;
                    plan.trees.insert(node.tree_id);
                    plan.top_level |= node.is_root();
                }
                Ok(plan)
            })
            .await?;

        let mut nodes: Vec<Node> = selected
            .iter()
            .map(|id| tx.get(*id).cloned())
            .collect::<AppResult<_>>()?;
        for node in &nodes {
            check_bounds(node)?;
        }
        nodes.sort_by_key(|n| (n.tree_id, n.left));

        let mut kept: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let covered = kept.last().is_some_and(|last| last.contains(&node));
            if !covered {
                kept.push(node);
            }
        }

        let rows = tx.rows_mut();
        let mut removed = 0;
        let mut trees: BTreeSet<TreeId> = BTreeSet::new();
        for node in &kept {
            removed += detach_subtree(rows, node).len();
            trees.insert(node.tree_id);
        }
        for tree in &trees {
            compact(rows, *tree);
        }
        let report = tx.commit().await?;
        self.forget_trees(&report);

        let deleted_roots: Vec<NodeId> = kept.iter().map(|n| n.id).collect();
        info!(
            selected = selected.len(),
            deleted = deleted_roots.len(),
            removed,
            trees = trees.len(),
            "Bulk delete committed"
        );
        Ok(DeleteReport {
            deleted_roots,
            removed,
            released: report.released,
        })
    }

    fn forget_trees(&self, report: &CommitReport) {
        if !report.emptied_trees.is_empty() {
            self.db.locks().forget(report.emptied_trees.iter().copied());
        }
    }
}

/// Reject targets that are files, lie inside the subtree itself, or ask
/// for an ordering the top level does not have.
fn validate_target(
    tx: &TreeTransaction,
    node: &Node,
    target: Option<NodeId>,
    placement: Placement,
    verb: &str,
) -> AppResult<()> {
    match target {
        Some(target_id) => {
            let parent = tx.get(target_id)?;
            check_bounds(parent)?;
            if !parent.is_folder() {
                return Err(AppError::invalid_target(format!(
                    "Cannot {verb} into '{}' ({}): it is a file",
                    parent.name, parent.id
                )));
            }
            if parent.is_within(node) {
                return Err(AppError::invalid_target(format!(
                    "Cannot {verb} '{}' ({}) into itself or one of its descendants",
                    node.name, node.id
                )));
            }
            Ok(())
        }
        None if placement == Placement::Last => Ok(()),
        None => Err(AppError::invalid_target(
            "Top-level nodes can only be appended after the last tree",
        )),
    }
}

/// Open room for a subtree of `width` bound values and return where its
/// root lands as `(tree, left, depth)`.
fn landing(
    rows: &mut Rows,
    target: Option<NodeId>,
    new_tree: Option<TreeId>,
    placement: Placement,
    width: u64,
) -> AppResult<(TreeId, u64, u32)> {
    match (target, new_tree) {
        (Some(target_id), _) => {
            let parent = rows
                .get(&target_id)
                .cloned()
                .ok_or_else(|| AppError::not_found(format!("Node {target_id} not found")))?;
            let at = {
                let children = children_of(rows, &parent);
                let index = placement_index(&children, placement)?;
                insertion_bound(&parent, &children, index)
            };
            open_gap(rows, parent.tree_id, at, width);
            Ok((parent.tree_id, at, parent.depth + 1))
        }
        (None, Some(tree)) => Ok((tree, 1, 0)),
        (None, None) => Err(AppError::internal("Top-level landing without a new tree")),
    }
}
