//! Content storage trait for pluggable blob backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;
use crate::types::ContentRef;

/// A byte stream type used for reading stored content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Durable blob store consumed by the tree engine.
///
/// The engine treats it as opaque: it stores uploaded bytes, reads them
/// back for probing, and releases them once no node references them.
/// Implementations live in `mediatree-storage`.
#[async_trait]
pub trait ContentStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store bytes and return a reference. `suggested_name` is a hint
    /// (sub-directory and extension); the provider picks the final key.
    async fn store(&self, data: Bytes, suggested_name: &str) -> AppResult<ContentRef>;

    /// Read stored content as a byte stream.
    async fn read(&self, content: &ContentRef) -> AppResult<ByteStream>;

    /// Read stored content into memory.
    async fn read_bytes(&self, content: &ContentRef) -> AppResult<Bytes>;

    /// Release stored content. Deleting a missing reference is not an error.
    async fn delete(&self, content: &ContentRef) -> AppResult<()>;

    /// Check whether the referenced content exists.
    async fn exists(&self, content: &ContentRef) -> AppResult<bool>;
}
