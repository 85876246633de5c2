//! Collaborator traits defined in `mediatree-core` and implemented by other crates.

pub mod storage;

pub use storage::{ByteStream, ContentStorage};
