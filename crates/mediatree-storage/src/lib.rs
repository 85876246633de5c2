//! # mediatree-storage
//!
//! Content storage providers for the media tree (local filesystem and
//! in-memory) plus the image probe that classifies uploads.

pub mod manager;
pub mod probe;
pub mod providers;

pub use manager::StorageManager;
pub use probe::{probe_image, ProbedMedia};
pub use providers::{LocalContentStorage, MemoryContentStorage};
