//! The in-memory node table and its secondary indexes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{ContentRef, NodeId, TreeId};
use mediatree_entity::Node;

/// Committed rows plus the indexes the engine queries by.
///
/// `by_tree_left` keeps the node id in the key so that duplicate bounds in
/// a corrupted tree stay visible to the integrity checker.
#[derive(Debug, Default)]
pub struct TableState {
    rows: HashMap<NodeId, Node>,
    by_tree_left: BTreeSet<(TreeId, u64, NodeId)>,
    by_parent_name: BTreeMap<(Option<NodeId>, String), BTreeSet<NodeId>>,
    content_refs: HashMap<ContentRef, usize>,
}

impl TableState {
    /// Look up a committed row.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.rows.get(&id)
    }

    /// Number of committed rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row, unordered.
    pub fn rows(&self) -> impl Iterator<Item = &Node> {
        self.rows.values()
    }

    /// Rows of one tree ordered by left bound.
    pub fn tree_rows(&self, tree: TreeId) -> impl Iterator<Item = &Node> {
        self.left_range(tree, 0, u64::MAX)
    }

    /// Rows of `tree` whose left bound lies in `[from, to)`, ordered by left.
    pub fn left_range(&self, tree: TreeId, from: u64, to: u64) -> impl Iterator<Item = &Node> {
        let (lo, hi) = if from < to {
            ((tree, from, NodeId::new(0)), (tree, to, NodeId::new(0)))
        } else {
            ((tree, from, NodeId::new(0)), (tree, from, NodeId::new(0)))
        };
        self.by_tree_left
            .range(lo..hi)
            .filter_map(|(_, _, id)| self.rows.get(id))
    }

    /// Distinct tree ids present in the table.
    pub fn tree_ids(&self) -> BTreeSet<TreeId> {
        self.by_tree_left.iter().map(|(tree, _, _)| *tree).collect()
    }

    /// Ids of the children of `parent` carrying `name`.
    pub fn named_children(&self, parent: Option<NodeId>, name: &str) -> Vec<NodeId> {
        self.by_parent_name
            .get(&(parent, name.to_string()))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Top-level rows ordered by tree id.
    pub fn roots(&self) -> Vec<&Node> {
        let mut roots: Vec<&Node> = self
            .by_parent_name
            .range((None, String::new())..)
            .take_while(|((parent, _), _)| parent.is_none())
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.rows.get(id))
            .collect();
        roots.sort_by_key(|n| (n.tree_id, n.left, n.id));
        roots
    }

    /// How many rows reference a piece of content.
    pub fn content_refcount(&self, content: &ContentRef) -> usize {
        self.content_refs.get(content).copied().unwrap_or(0)
    }

    /// Insert or replace a row, keeping every index current.
    pub(crate) fn upsert(&mut self, node: Node) {
        if let Some(old) = self.rows.remove(&node.id) {
            self.unindex(&old);
        }
        self.index(&node);
        self.rows.insert(node.id, node);
    }

    /// Remove a row and its index entries.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let old = self.rows.remove(&id)?;
        self.unindex(&old);
        Some(old)
    }

    fn index(&mut self, node: &Node) {
        self.by_tree_left.insert((node.tree_id, node.left, node.id));
        self.by_parent_name
            .entry((node.parent_id, node.name.clone()))
            .or_default()
            .insert(node.id);
        for content in node.content_refs() {
            *self.content_refs.entry(content.clone()).or_insert(0) += 1;
        }
    }

    fn unindex(&mut self, node: &Node) {
        self.by_tree_left.remove(&(node.tree_id, node.left, node.id));
        let key = (node.parent_id, node.name.clone());
        if let Some(ids) = self.by_parent_name.get_mut(&key) {
            ids.remove(&node.id);
            if ids.is_empty() {
                self.by_parent_name.remove(&key);
            }
        }
        for content in node.content_refs() {
            if let Some(count) = self.content_refs.get_mut(content) {
                *count -= 1;
                if *count == 0 {
                    self.content_refs.remove(content);
                }
            }
        }
    }
}

/// The node table: committed state behind a read/write lock plus the id
/// allocators.
#[derive(Debug)]
pub struct NodeTable {
    state: RwLock<TableState>,
    next_node_id: AtomicU64,
    next_tree_id: AtomicU64,
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TableState::default()),
            next_node_id: AtomicU64::new(1),
            next_tree_id: AtomicU64::new(1),
        }
    }

    /// Build a table from persisted rows.
    pub fn from_rows(rows: Vec<Node>) -> AppResult<Self> {
        let mut state = TableState::default();
        let mut max_node = 0;
        let mut max_tree = 0;
        for row in rows {
            if state.get(row.id).is_some() {
                return Err(AppError::tree_corruption(format!(
                    "Duplicate node id {} in persisted rows",
                    row.id
                )));
            }
            max_node = max_node.max(row.id.get());
            max_tree = max_tree.max(row.tree_id.get());
            state.upsert(row);
        }
        Ok(Self {
            state: RwLock::new(state),
            next_node_id: AtomicU64::new(max_node + 1),
            next_tree_id: AtomicU64::new(max_tree + 1),
        })
    }

    /// Shared access to the committed state.
    pub async fn read(&self) -> RwLockReadGuard<'_, TableState> {
        self.state.read().await
    }

    /// Exclusive access to the committed state.
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, TableState> {
        self.state.write().await
    }

    /// Allocate a fresh node id.
    pub fn allocate_node_id(&self) -> NodeId {
        NodeId::new(self.next_node_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Allocate a tree id greater than every id handed out so far.
    pub fn allocate_tree_id(&self) -> TreeId {
        TreeId::new(self.next_tree_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Fetch a committed row.
    pub async fn get(&self, id: NodeId) -> Option<Node> {
        self.read().await.get(id).cloned()
    }

    /// Every committed row ordered by tree and left bound.
    pub async fn ordered_rows(&self) -> Vec<Node> {
        let state = self.read().await;
        state
            .by_tree_left
            .iter()
            .filter_map(|(_, _, id)| state.rows.get(id).cloned())
            .collect()
    }
}
