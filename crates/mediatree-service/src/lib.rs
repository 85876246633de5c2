//! # mediatree-service
//!
//! Use cases over the media tree. Each service wraps the repositories and
//! the content storage manager it needs, and every call receives an
//! explicit [`OperationContext`] instead of reading ambient request state.

pub mod context;
pub mod mutation;
pub mod node;
pub mod registry;
pub mod tree;

pub use context::OperationContext;
pub use mutation::MutationService;
pub use node::{NodeService, UploadParams, UploadService};
pub use registry::Services;
pub use tree::TreeService;
