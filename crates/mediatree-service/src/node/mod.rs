//! Node use cases: folder creation, uploads, and field edits.

pub mod service;
pub mod upload;

pub use service::NodeService;
pub use upload::{UploadParams, UploadService};
