//! Repository implementations over the node table.

pub mod node;
pub mod tree;

pub use node::{NewNode, NodeRepository, NodeUpdate};
pub use tree::TreeRepository;
