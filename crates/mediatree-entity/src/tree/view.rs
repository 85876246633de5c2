//! Nested tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use mediatree_core::types::NodeId;

use crate::node::{MediaType, Node};

/// A node in a nested tree view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNodeView {
    /// Node ID.
    pub id: NodeId,
    /// Node name.
    pub name: String,
    /// Media classification.
    pub media_type: MediaType,
    /// Depth level.
    pub depth: u32,
    /// Number of descendants.
    pub descendant_count: u64,
    /// File size (files only).
    pub size: Option<u64>,
    /// Child nodes in pre-order.
    pub children: Vec<TreeNodeView>,
}

impl TreeNodeView {
    /// A leaf view of a single node.
    pub fn leaf(node: &Node) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            media_type: node.media_type(),
            depth: node.depth,
            descendant_count: node.descendant_count(),
            size: node.size(),
            children: Vec::new(),
        }
    }

    /// Number of views in this subtree, including itself.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeNodeView::len).sum::<usize>()
    }
}

/// A forest of nested views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTree {
    /// The root views.
    pub roots: Vec<TreeNodeView>,
    /// Total number of nodes in the forest.
    pub total_nodes: u64,
}

impl NodeTree {
    /// Create an empty tree.
    pub fn empty() -> Self {
        Self {
            roots: Vec::new(),
            total_nodes: 0,
        }
    }

    /// Nest a pre-order node sequence (ordered by tree, then left bound).
    ///
    /// Each node is attached to the nearest preceding node that contains
    /// it; nodes without a containing predecessor become roots.
    pub fn from_preorder(nodes: &[Node]) -> Self {
        let mut roots: Vec<TreeNodeView> = Vec::new();
        // Open ancestors: (right bound, tree id, view).
        let mut stack: Vec<(u64, u64, TreeNodeView)> = Vec::new();

        for node in nodes {
            while let Some((right, tree, view)) = stack.pop() {
                if tree == node.tree_id.get() && node.right < right {
                    stack.push((right, tree, view));
                    break;
                }
                attach(&mut stack, &mut roots, view);
            }
            stack.push((node.right, node.tree_id.get(), TreeNodeView::leaf(node)));
        }
        while let Some((_, _, done)) = stack.pop() {
            attach(&mut stack, &mut roots, done);
        }

        Self {
            total_nodes: nodes.len() as u64,
            roots,
        }
    }
}

fn attach(
    stack: &mut [(u64, u64, TreeNodeView)],
    roots: &mut Vec<TreeNodeView>,
    view: TreeNodeView,
) {
    match stack.last_mut() {
        Some((_, _, parent)) => parent.children.push(view),
        None => roots.push(view),
    }
}
