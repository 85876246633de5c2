//! Breadcrumbs, paths, nested views and aggregates.
//!
//! These are derived on demand from committed rows and are never stored.

use std::collections::HashSet;

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{NodeId, TreeId};
use mediatree_database::{Database, DescendantCursor, IntegrityReport, TreeRepository};
use mediatree_entity::{Breadcrumb, Node, NodeTree, TreeNodeView};

/// Batch size used when streaming large subtrees.
const AGGREGATE_BATCH: usize = 512;

/// Read views over the forest.
#[derive(Debug, Clone)]
pub struct TreeService {
    trees: TreeRepository,
}

impl TreeService {
    /// Creates a new tree service.
    pub fn new(db: Database) -> Self {
        Self {
            trees: TreeRepository::new(db),
        }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &TreeRepository {
        &self.trees
    }

    /// Virtual root, ancestors, then the node itself.
    pub async fn breadcrumbs(&self, id: NodeId) -> AppResult<Vec<Breadcrumb>> {
        let node = self.trees.get(id).await?;
        let ancestors = self.trees.ancestors(id).await?;
        let mut trail = Vec::with_capacity(ancestors.len() + 2);
        trail.push(Breadcrumb::virtual_root());
        trail.extend(ancestors.iter().map(Breadcrumb::from));
        trail.push(Breadcrumb::from(&node));
        Ok(trail)
    }

    /// Slash-joined names from the tree root, e.g. `A/B/c.txt`.
    pub async fn path(&self, id: NodeId) -> AppResult<String> {
        let node = self.trees.get(id).await?;
        let mut names: Vec<String> = self
            .trees
            .ancestors(id)
            .await?
            .into_iter()
            .map(|n| n.name)
            .collect();
        names.push(node.name);
        Ok(names.join("/"))
    }

    /// Nested view of a node and its subtree.
    pub async fn subtree(&self, id: NodeId) -> AppResult<TreeNodeView> {
        let mut rows = vec![self.trees.get(id).await?];
        rows.extend(self.trees.descendants(id).await?);
        NodeTree::from_preorder(&rows)
            .roots
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal(format!("Empty view for node {id}")))
    }

    /// Nested view of every tree.
    pub async fn forest(&self) -> NodeTree {
        NodeTree::from_preorder(&self.trees.forest().await)
    }

    /// Nested view of folders only, for folder pickers.
    pub async fn folder_tree(&self) -> NodeTree {
        let folders: Vec<Node> = self
            .trees
            .forest()
            .await
            .into_iter()
            .filter(Node::is_folder)
            .collect();
        NodeTree::from_preorder(&folders)
    }

    /// Children, optionally restricted to published nodes.
    pub async fn children(&self, id: NodeId, published_only: bool) -> AppResult<Vec<Node>> {
        Ok(published(self.trees.children(id).await?, published_only))
    }

    /// Top-level nodes, optionally restricted to published nodes.
    pub async fn roots(&self, published_only: bool) -> Vec<Node> {
        published(self.trees.roots().await, published_only)
    }

    /// Total size of a file, or of every file below a folder.
    pub async fn total_size(&self, id: NodeId) -> AppResult<u64> {
        let node = self.trees.get(id).await?;
        let mut total = node.size().unwrap_or(0);
        let mut cursor = DescendantCursor::new(id);
        loop {
            let batch = cursor.next_batch(&self.trees, AGGREGATE_BATCH).await?;
            if batch.is_empty() {
                break;
            }
            total += batch.iter().filter_map(Node::size).sum::<u64>();
            if cursor.is_exhausted() {
                break;
            }
        }
        Ok(total)
    }

    /// For folders, whether every descendant has its metadata entered;
    /// for files, whether the file itself has.
    pub async fn has_metadata_including_descendants(&self, id: NodeId) -> AppResult<bool> {
        let node = self.trees.get(id).await?;
        if node.is_file() {
            return Ok(node.has_metadata());
        }
        Ok(self
            .trees
            .descendants(id)
            .await?
            .iter()
            .all(Node::has_metadata))
    }

    /// Whether the node is one of `ancestors` or lies below one of them.
    pub async fn is_descendant_of(&self, id: NodeId, ancestors: &[NodeId]) -> AppResult<bool> {
        let set: HashSet<NodeId> = ancestors.iter().copied().collect();
        if set.contains(&id) {
            return Ok(true);
        }
        Ok(self
            .trees
            .ancestors(id)
            .await?
            .iter()
            .any(|a| set.contains(&a.id)))
    }

    /// Integrity report for one tree or the whole forest.
    pub async fn check(&self, scope: Option<TreeId>) -> IntegrityReport {
        self.trees.check(scope).await
    }
}

fn published(nodes: Vec<Node>, published_only: bool) -> Vec<Node> {
    if !published_only {
        return nodes;
    }
    nodes
        .into_iter()
        .filter(|n| n.metadata.published)
        .collect()
}
