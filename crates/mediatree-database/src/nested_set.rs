//! Bound arithmetic over a transaction's working rows.
//!
//! Rows are addressed by id in a plain map; every helper here only touches
//! rows of the tree it is given.

use std::collections::{BTreeSet, HashMap};

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{NodeId, TreeId};
use mediatree_entity::{Node, Placement};

pub(crate) type Rows = HashMap<NodeId, Node>;

/// Fail with `TreeCorruption` unless `node` has `left < right` with an odd
/// span, the only shape a subtree can take.
pub(crate) fn check_bounds(node: &Node) -> AppResult<()> {
    if node.left >= node.right || (node.right - node.left) % 2 == 0 {
        return Err(AppError::tree_corruption(format!(
            "Node {} has invalid bounds {}..{}",
            node.id, node.left, node.right
        )));
    }
    Ok(())
}

/// Rows of `tree` ordered by left bound.
pub(crate) fn tree_order(rows: &Rows, tree: TreeId) -> Vec<&Node> {
    let mut ordered: Vec<&Node> = rows.values().filter(|n| n.tree_id == tree).collect();
    ordered.sort_by_key(|n| (n.left, n.id));
    ordered
}

/// Direct children of `parent` by bounds, ordered by left.
pub(crate) fn children_of<'a>(rows: &'a Rows, parent: &Node) -> Vec<&'a Node> {
    let mut children: Vec<&Node> = rows
        .values()
        .filter(|n| parent.contains(n) && n.depth == parent.depth + 1)
        .collect();
    children.sort_by_key(|n| (n.left, n.id));
    children
}

/// Remove `root` and everything inside its bounds. Returns the removed rows
/// ordered by left.
pub(crate) fn detach_subtree(rows: &mut Rows, root: &Node) -> Vec<Node> {
    let ids: Vec<NodeId> = rows
        .values()
        .filter(|n| n.is_within(root))
        .map(|n| n.id)
        .collect();
    let mut detached: Vec<Node> = ids.iter().filter_map(|id| rows.remove(id)).collect();
    detached.sort_by_key(|n| (n.left, n.id));
    detached
}

/// Clone `root` and everything inside its bounds, ordered by left.
pub(crate) fn clone_subtree(rows: &Rows, root: &Node) -> Vec<Node> {
    let mut cloned: Vec<Node> = rows
        .values()
        .filter(|n| n.is_within(root))
        .cloned()
        .collect();
    cloned.sort_by_key(|n| (n.left, n.id));
    cloned
}

/// Close the gap of `width` bound values left behind a removed subtree
/// whose right bound was `after`.
pub(crate) fn close_gap(rows: &mut Rows, tree: TreeId, after: u64, width: u64) {
    for node in rows.values_mut().filter(|n| n.tree_id == tree) {
        if node.left > after {
            node.left = node.left.saturating_sub(width);
        }
        if node.right > after {
            node.right = node.right.saturating_sub(width);
        }
    }
}

/// Open a gap of `width` bound values starting at `at`.
pub(crate) fn open_gap(rows: &mut Rows, tree: TreeId, at: u64, width: u64) {
    for node in rows.values_mut().filter(|n| n.tree_id == tree) {
        if node.left >= at {
            node.left += width;
        }
        if node.right >= at {
            node.right += width;
        }
    }
}

/// Shift a detached or cloned subtree (ordered by left, root first) so
/// that its root starts at `at` in `tree` with depth `root_depth`.
pub(crate) fn relocate(subtree: &mut [Node], tree: TreeId, at: u64, root_depth: u32) {
    let Some(root) = subtree.first() else { return };
    let left_base = root.left;
    let depth_base = root.depth;
    for node in subtree.iter_mut() {
        node.left = node.left.saturating_sub(left_base) + at;
        node.right = node.right.saturating_sub(left_base) + at;
        node.depth = node.depth.saturating_sub(depth_base) + root_depth;
        node.tree_id = tree;
    }
}

/// Index among `children` where a placement lands.
pub(crate) fn placement_index(children: &[&Node], placement: Placement) -> AppResult<usize> {
    let position_of = |anchor: NodeId| {
        children.iter().position(|c| c.id == anchor).ok_or_else(|| {
            AppError::invalid_target(format!("Node {anchor} is not a child of the target"))
        })
    };
    match placement {
        Placement::First => Ok(0),
        Placement::Last => Ok(children.len()),
        Placement::Index(index) => Ok(index.min(children.len())),
        Placement::Before(anchor) => position_of(anchor),
        Placement::After(anchor) => position_of(anchor).map(|i| i + 1),
    }
}

/// The left bound a subtree inserted at `index` among `parent`'s children
/// receives.
pub(crate) fn insertion_bound(parent: &Node, children: &[&Node], index: usize) -> u64 {
    children.get(index).map_or(parent.right, |child| child.left)
}

/// Restore contiguous bounds in `tree` after whole subtrees were removed.
///
/// The surviving bound values keep their relative order, so ranking them
/// yields `1..=2n` without changing the shape.
pub(crate) fn compact(rows: &mut Rows, tree: TreeId) {
    let values: BTreeSet<u64> = rows
        .values()
        .filter(|n| n.tree_id == tree)
        .flat_map(|n| [n.left, n.right])
        .collect();
    let rank: HashMap<u64, u64> = values
        .into_iter()
        .zip(1u64..)
        .collect();
    for node in rows.values_mut().filter(|n| n.tree_id == tree) {
        node.left = rank[&node.left];
        node.right = rank[&node.right];
    }
}
