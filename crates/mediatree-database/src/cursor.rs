//! Batched, restartable iteration over a subtree.

use mediatree_core::result::AppResult;
use mediatree_core::types::NodeId;
use mediatree_entity::Node;

use crate::repositories::TreeRepository;

/// Walks the descendants of one node in pre-order, one batch at a time.
///
/// The cursor remembers its position as an offset from the node's left
/// bound, so it keeps working when the whole subtree is moved between
/// batches. Rows inserted or removed inside the subtree meanwhile may be
/// skipped or seen twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescendantCursor {
    node_id: NodeId,
    offset: u64,
    exhausted: bool,
}

impl DescendantCursor {
    /// Start before the first descendant of `node_id`.
    pub fn new(node_id: NodeId) -> Self {
        Self::resume(node_id, 0)
    }

    /// Continue from a position previously returned by [`Self::position`].
    pub fn resume(node_id: NodeId, position: u64) -> Self {
        Self {
            node_id,
            offset: position,
            exhausted: false,
        }
    }

    /// The node whose subtree is walked.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Opaque position to resume from.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Whether the last batch reached the end of the subtree.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next batch of up to `limit` descendants. An empty batch
    /// means the walk is complete.
    pub async fn next_batch(&mut self, repo: &TreeRepository, limit: usize) -> AppResult<Vec<Node>> {
        if self.exhausted || limit == 0 {
            return Ok(Vec::new());
        }
        let (node, batch) = repo.descendants_after(self.node_id, self.offset, limit).await?;
        match batch.last() {
            Some(last) => self.offset = last.left - node.left,
            None => self.exhausted = true,
        }
        if batch.len() < limit {
            self.exhausted = true;
        }
        Ok(batch)
    }
}
