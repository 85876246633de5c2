//! Recompute nested-set bounds from parent pointers alone.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{NodeId, TreeId};

use super::MutationEngine;
use crate::locks::LockPlan;
use crate::naming::NamePolicy;
use crate::nested_set::Rows;
use crate::transaction::TreeTransaction;

/// Outcome of a rebuild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Trees after the rebuild.
    pub trees: usize,
    /// Rows visited.
    pub nodes: usize,
    /// Rows whose encoding or parent changed.
    pub changed: usize,
    /// Nodes promoted to the top level because their parent was missing
    /// or the parent chain formed a cycle.
    pub promoted: Vec<NodeId>,
}

/// Target encoding of one row.
#[derive(Debug, Clone, Copy)]
struct Slot {
    parent_id: Option<NodeId>,
    tree_id: TreeId,
    left: u64,
    right: u64,
    depth: u32,
}

/// Children lists keyed by parent, sorted by current (tree, left, id).
fn child_lists(rows: &Rows) -> HashMap<NodeId, Vec<NodeId>> {
    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for node in rows.values() {
        if let Some(parent) = node.parent_id {
            if parent != node.id && rows.contains_key(&parent) {
                children.entry(parent).or_default().push(node.id);
            }
        }
    }
    for list in children.values_mut() {
        list.sort_by_key(|id| {
            let n = &rows[id];
            (n.tree_id, n.left, n.id)
        });
    }
    children
}

/// Number one tree by a depth-first pre-order walk from `root`.
fn number_tree(
    root: NodeId,
    tree_id: TreeId,
    children: &HashMap<NodeId, Vec<NodeId>>,
    visited: &mut HashSet<NodeId>,
    slots: &mut HashMap<NodeId, Slot>,
) {
    // (node, parent, depth, left, next child index)
    let mut stack: Vec<(NodeId, Option<NodeId>, u32, u64, usize)> = Vec::new();
    let mut counter = 1u64;
    visited.insert(root);
    stack.push((root, None, 0, counter, 0));
    counter += 1;

    while let Some(frame) = stack.last_mut() {
        let list = children.get(&frame.0).map(Vec::as_slice).unwrap_or(&[]);
        while frame.4 < list.len() && visited.contains(&list[frame.4]) {
            frame.4 += 1;
        }
        if frame.4 < list.len() {
            let child = list[frame.4];
            frame.4 += 1;
            let (parent, depth) = (frame.0, frame.2);
            visited.insert(child);
            stack.push((child, Some(parent), depth + 1, counter, 0));
        } else {
            let (id, parent_id, depth, left, _) = *frame;
            stack.pop();
            slots.insert(
                id,
                Slot {
                    parent_id,
                    tree_id,
                    left,
                    right: counter,
                    depth,
                },
            );
        }
        counter += 1;
    }
}

/// Follow parent pointers up from the unvisited `start` until an id
/// repeats and return the lowest id on that loop. Nodes hanging below the
/// loop keep their parent.
fn cycle_breaker(rows: &Rows, start: NodeId, visited: &HashSet<NodeId>) -> NodeId {
    let mut chain: Vec<NodeId> = Vec::new();
    let mut seen: HashMap<NodeId, usize> = HashMap::new();
    let mut current = start;
    loop {
        if let Some(&at) = seen.get(&current) {
            return chain[at..].iter().copied().min().unwrap_or(start);
        }
        seen.insert(current, chain.len());
        chain.push(current);
        match rows.get(&current).and_then(|n| n.parent_id) {
            Some(parent) if rows.contains_key(&parent) && !visited.contains(&parent) => {
                current = parent;
            }
            _ => return start,
        }
    }
}

/// Write slots back, counting rows that changed.
fn apply_slots(rows: &mut Rows, slots: &HashMap<NodeId, Slot>) -> usize {
    let mut changed = 0;
    for (id, slot) in slots {
        let Some(node) = rows.get_mut(id) else { continue };
        let before = (node.parent_id, node.tree_id, node.left, node.right, node.depth);
        let after = (slot.parent_id, slot.tree_id, slot.left, slot.right, slot.depth);
        if before != after {
            node.parent_id = slot.parent_id;
            node.tree_id = slot.tree_id;
            node.left = slot.left;
            node.right = slot.right;
            node.depth = slot.depth;
            changed += 1;
        }
    }
    changed
}

impl MutationEngine {
    /// Rebuild every tree.
    ///
    /// Children keep their current relative order. Nodes whose parent is
    /// missing become top-level; a parent-pointer cycle is broken by
    /// promoting its lowest id. Each root keeps its tree id unless another
    /// root already claimed it. Rebuilding a consistent forest changes
    /// nothing.
    pub async fn rebuild(&self) -> AppResult<RebuildReport> {
        let mut tx = self
            .db
            .begin(|state| Ok(LockPlan::trees(state.tree_ids()).with_top_level(true)))
            .await?;

        let rows = tx.rows();
        let children = child_lists(rows);
        let mut promoted: Vec<NodeId> = Vec::new();
        let mut roots: Vec<NodeId> = Vec::new();
        for node in rows.values() {
            match node.parent_id {
                None => roots.push(node.id),
                Some(parent) if parent == node.id || !rows.contains_key(&parent) => {
                    warn!(node_id = %node.id, parent_id = %parent, "Promoting orphaned node");
                    roots.push(node.id);
                    promoted.push(node.id);
                }
                Some(_) => {}
            }
        }
        roots.sort_by_key(|id| {
            let n = &rows[id];
            (n.tree_id, n.left, n.id)
        });
        let all: BTreeSet<NodeId> = rows.keys().copied().collect();

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut slots: HashMap<NodeId, Slot> = HashMap::new();
        let mut claimed: HashSet<TreeId> = HashSet::new();
        let mut pending = roots;
        loop {
            for root in pending.drain(..) {
                let current = tx.get(root)?.tree_id;
                let tree_id = if claimed.insert(current) {
                    current
                } else {
                    let fresh = tx.allocate_tree()?;
                    claimed.insert(fresh);
                    fresh
                };
                number_tree(root, tree_id, &children, &mut visited, &mut slots);
            }
            match all.iter().find(|id| !visited.contains(id)) {
                Some(id) => {
                    let breaker = cycle_breaker(tx.rows(), *id, &visited);
                    warn!(node_id = %breaker, "Breaking parent cycle by promoting node");
                    promoted.push(breaker);
                    pending.push(breaker);
                }
                None => break,
            }
        }

        let changed = apply_slots(tx.rows_mut(), &slots);
        rename_promoted(&mut tx, &promoted, &self.db.name_policy())?;
        let nodes = slots.len();
        let trees = claimed.len();
        tx.commit().await?;

        info!(trees, nodes, changed, promoted = promoted.len(), "Forest rebuilt");
        Ok(RebuildReport {
            trees,
            nodes,
            changed,
            promoted,
        })
    }

    /// Rebuild one tree in place. Requires a single root and every parent
    /// pointer to stay inside the tree; anything else needs a full
    /// [`rebuild`](Self::rebuild).
    pub async fn rebuild_tree(&self, tree: TreeId) -> AppResult<RebuildReport> {
        let mut tx = self
            .db
            .begin(|_| Ok(LockPlan::trees([tree])))
            .await?;

        let rows = tx.rows();
        if rows.is_empty() {
            return Err(AppError::not_found(format!("Tree {tree} has no nodes")));
        }
        let roots: Vec<NodeId> = rows
            .values()
            .filter(|n| n.parent_id.is_none_or(|p| !rows.contains_key(&p)))
            .map(|n| n.id)
            .collect();
        let root = match roots.as_slice() {
            [root] if rows[root].parent_id.is_none() => *root,
            _ => {
                return Err(AppError::tree_corruption(format!(
                    "Tree {tree} has {} candidate root(s) or a parent outside the tree; run a full rebuild",
                    roots.len()
                )));
            }
        };

        let children = child_lists(rows);
        let mut visited = HashSet::new();
        let mut slots = HashMap::new();
        number_tree(root, tree, &children, &mut visited, &mut slots);
        if visited.len() != rows.len() {
            return Err(AppError::tree_corruption(format!(
                "Tree {tree} holds {} node(s) unreachable from its root; run a full rebuild",
                rows.len() - visited.len()
            )));
        }

        let changed = apply_slots(tx.rows_mut(), &slots);
        let nodes = slots.len();
        tx.commit().await?;

        info!(tree_id = %tree, nodes, changed, "Tree rebuilt");
        Ok(RebuildReport {
            trees: 1,
            nodes,
            changed,
            promoted: Vec::new(),
        })
    }
}

/// Give promoted nodes top-level names no other root uses, and drop their
/// default flag.
fn rename_promoted(
    tx: &mut TreeTransaction,
    promoted: &[NodeId],
    policy: &NamePolicy,
) -> AppResult<()> {
    let policy = match policy {
        NamePolicy::Reject => NamePolicy::default(),
        numbered => numbered.clone(),
    };
    for id in promoted {
        let node = tx.get(*id)?;
        let name = tx.unique_name_under(None, &node.name, node.is_folder(), Some(*id), &policy)?;
        let node = tx.get_mut(*id)?;
        node.name = name;
        node.is_default = false;
    }
    Ok(())
}
