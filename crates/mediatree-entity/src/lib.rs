//! # mediatree-entity
//!
//! Domain entity models for the media tree. [`node::Node`] is the single
//! row type stored in the node table; every other struct in this crate is a
//! value object derived from nodes for callers outside the core.

pub mod node;
pub mod tree;

pub use node::{
    Dimensions, FilePayload, HasImageDimensions, HasPreview, MediaType, Metadata, Node, NodeKind,
    Placement,
};
pub use tree::{Breadcrumb, NodeTree, TreeNodeView};
