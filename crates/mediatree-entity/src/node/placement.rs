//! Where a moved or copied subtree lands among the target's children.

use serde::{Deserialize, Serialize};

use mediatree_core::types::NodeId;

/// Insertion point among the children of a target parent, evaluated
/// against the children as they are after the moving subtree is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "at", content = "node", rename_all = "snake_case")]
pub enum Placement {
    /// Before every existing child.
    First,
    /// After every existing child.
    #[default]
    Last,
    /// At a zero-based index, clamped to the child count.
    Index(usize),
    /// Immediately before a sibling.
    Before(NodeId),
    /// Immediately after a sibling.
    After(NodeId),
}

impl Placement {
    /// The sibling this placement is anchored on, if any.
    pub fn anchor(&self) -> Option<NodeId> {
        match self {
            Self::Before(id) | Self::After(id) => Some(*id),
            _ => None,
        }
    }
}
