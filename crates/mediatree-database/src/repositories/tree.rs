//! Structural queries over committed rows.
//!
//! Queries take the table's read lock only, so they never wait on tree
//! locks and always observe a fully committed state. Every query checks
//! the bounds it relies on and reports `TreeCorruption` instead of
//! returning a silently wrong answer.

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{NodeId, TreeId};
use mediatree_entity::Node;

use crate::database::Database;
use crate::integrity::{self, IntegrityReport};
use crate::nested_set::check_bounds;
use crate::table::TableState;

/// Repository for nested-set tree queries.
#[derive(Debug, Clone)]
pub struct TreeRepository {
    db: Database,
}

impl TreeRepository {
    /// Create a new tree repository.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Find a node by ID.
    pub async fn find_by_id(&self, id: NodeId) -> Option<Node> {
        self.db.table().get(id).await
    }

    /// Fetch a node by ID, `NotFound` if it does not exist.
    pub async fn get(&self, id: NodeId) -> AppResult<Node> {
        self.find_by_id(id)
            .await
            .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))
    }

    /// All descendants in pre-order (ordered by left bound).
    pub async fn descendants(&self, id: NodeId) -> AppResult<Vec<Node>> {
        let state = self.db.table().read().await;
        let node = lookup(&state, id)?;
        Ok(descendants_of(&state, node)?.into_iter().cloned().collect())
    }

    /// At most `limit` descendants whose left bound lies more than
    /// `after_offset` past the node's own. Offsets survive moves of the
    /// whole subtree. Also returns the node as currently committed.
    pub async fn descendants_after(
        &self,
        id: NodeId,
        after_offset: u64,
        limit: usize,
    ) -> AppResult<(Node, Vec<Node>)> {
        let state = self.db.table().read().await;
        let node = lookup(&state, id)?;
        check_bounds(node)?;
        let from = node.left.saturating_add(after_offset).saturating_add(1);
        let mut page = Vec::with_capacity(limit.min(64));
        for descendant in state.left_range(node.tree_id, from, node.right).take(limit) {
            ensure_inside(node, descendant)?;
            page.push(descendant.clone());
        }
        Ok((node.clone(), page))
    }

    /// Number of descendants, from the bounds alone.
    pub async fn descendant_count(&self, id: NodeId) -> AppResult<u64> {
        let node = self.get(id).await?;
        check_bounds(&node)?;
        Ok(node.descendant_count())
    }

    /// Ancestors from the tree root down to the parent.
    pub async fn ancestors(&self, id: NodeId) -> AppResult<Vec<Node>> {
        let state = self.db.table().read().await;
        let node = lookup(&state, id)?;
        Ok(ancestors_of(&state, node)?.into_iter().cloned().collect())
    }

    /// Direct children ordered by left bound.
    pub async fn children(&self, id: NodeId) -> AppResult<Vec<Node>> {
        let state = self.db.table().read().await;
        let node = lookup(&state, id)?;
        Ok(children_of(&state, node)?.into_iter().cloned().collect())
    }

    /// Other children of the node's parent, in sibling order. Top-level
    /// nodes are siblings of each other.
    pub async fn siblings(&self, id: NodeId) -> AppResult<Vec<Node>> {
        let state = self.db.table().read().await;
        let node = lookup(&state, id)?;
        let family: Vec<&Node> = match node.parent_id {
            None => state.roots(),
            Some(parent_id) => children_of(&state, lookup(&state, parent_id)?)?,
        };
        Ok(family
            .into_iter()
            .filter(|n| n.id != id)
            .cloned()
            .collect())
    }

    /// Top-level nodes ordered by tree id.
    pub async fn roots(&self) -> Vec<Node> {
        let state = self.db.table().read().await;
        state.roots().into_iter().cloned().collect()
    }

    /// Every row of the forest in pre-order, tree by tree.
    pub async fn forest(&self) -> Vec<Node> {
        self.db.table().ordered_rows().await
    }

    /// Every row of one tree in pre-order.
    pub async fn tree(&self, tree: TreeId) -> Vec<Node> {
        let state = self.db.table().read().await;
        state.tree_rows(tree).cloned().collect()
    }

    /// Check the nested-set invariants of one tree or of every tree.
    pub async fn check(&self, scope: Option<TreeId>) -> IntegrityReport {
        let state = self.db.table().read().await;
        integrity::check(&state, scope)
    }
}

pub(crate) fn lookup(state: &TableState, id: NodeId) -> AppResult<&Node> {
    state
        .get(id)
        .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))
}

fn ensure_inside(outer: &Node, inner: &Node) -> AppResult<()> {
    if inner.left >= inner.right || inner.right >= outer.right || inner.depth <= outer.depth {
        return Err(AppError::tree_corruption(format!(
            "Node {} ({}..{} depth {}) escapes the bounds of node {} ({}..{} depth {})",
            inner.id,
            inner.left,
            inner.right,
            inner.depth,
            outer.id,
            outer.left,
            outer.right,
            outer.depth
        )));
    }
    Ok(())
}

pub(crate) fn descendants_of<'a>(state: &'a TableState, node: &Node) -> AppResult<Vec<&'a Node>> {
    check_bounds(node)?;
    let found: Vec<&Node> = state
        .left_range(node.tree_id, node.left + 1, node.right)
        .collect();
    for descendant in &found {
        ensure_inside(node, descendant)?;
    }
    if found.len() as u64 != node.descendant_count() {
        return Err(AppError::tree_corruption(format!(
            "Node {} spans {} descendant(s) but {} row(s) lie inside",
            node.id,
            node.descendant_count(),
            found.len()
        )));
    }
    Ok(found)
}

pub(crate) fn ancestors_of<'a>(state: &'a TableState, node: &Node) -> AppResult<Vec<&'a Node>> {
    check_bounds(node)?;
    let chain: Vec<&Node> = state
        .left_range(node.tree_id, 0, node.left)
        .filter(|a| a.right > node.right)
        .collect();
    let consistent = chain.len() == node.depth as usize
        && chain
            .iter()
            .enumerate()
            .all(|(depth, a)| a.depth as usize == depth);
    if !consistent {
        return Err(AppError::tree_corruption(format!(
            "Node {} at depth {} has {} enclosing node(s)",
            node.id,
            node.depth,
            chain.len()
        )));
    }
    Ok(chain)
}

pub(crate) fn children_of<'a>(state: &'a TableState, node: &Node) -> AppResult<Vec<&'a Node>> {
    let children: Vec<&Node> = descendants_of(state, node)?
        .into_iter()
        .filter(|c| c.depth == node.depth + 1)
        .collect();
    for pair in children.windows(2) {
        if pair[1].left <= pair[0].right {
            return Err(AppError::tree_corruption(format!(
                "Sibling bounds of nodes {} and {} overlap",
                pair[0].id, pair[1].id
            )));
        }
    }
    Ok(children)
}
