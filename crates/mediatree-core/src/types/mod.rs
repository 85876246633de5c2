//! Core type definitions used across the media tree workspace.

pub mod content;
pub mod id;

pub use content::ContentRef;
pub use id::{NodeId, TreeId};
