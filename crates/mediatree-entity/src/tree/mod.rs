//! Read-only views derived from the node table for presentation callers.

pub mod breadcrumb;
pub mod view;

pub use breadcrumb::Breadcrumb;
pub use view::{NodeTree, TreeNodeView};
