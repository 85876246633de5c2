//! Breadcrumb trail entries, including the virtual forest root.

use serde::{Deserialize, Serialize};

use mediatree_core::types::NodeId;

use crate::node::Node;

/// Label of the virtual root shown above every top-level node.
pub const VIRTUAL_ROOT_LABEL: &str = "Media objects";

/// Depth of the virtual root. It is never persisted as a node.
pub const VIRTUAL_ROOT_DEPTH: i64 = -1;

/// One entry of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// The node id, `None` for the virtual root.
    pub id: Option<NodeId>,
    /// Display name.
    pub name: String,
    /// Depth, `-1` for the virtual root.
    pub depth: i64,
    /// Whether the entry is a folder (the virtual root counts as one).
    pub is_folder: bool,
}

impl Breadcrumb {
    /// The virtual root of the forest.
    pub fn virtual_root() -> Self {
        Self {
            id: None,
            name: VIRTUAL_ROOT_LABEL.to_string(),
            depth: VIRTUAL_ROOT_DEPTH,
            is_folder: true,
        }
    }

    /// Whether this is the virtual root.
    pub fn is_virtual_root(&self) -> bool {
        self.id.is_none()
    }
}

impl From<&Node> for Breadcrumb {
    fn from(node: &Node) -> Self {
        Self {
            id: Some(node.id),
            name: node.name.clone(),
            depth: i64::from(node.depth),
            is_folder: node.is_folder(),
        }
    }
}
