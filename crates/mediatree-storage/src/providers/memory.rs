//! In-memory content storage, used for tests and throwaway sessions.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::traits::storage::{ByteStream, ContentStorage};
use mediatree_core::types::ContentRef;

use super::content_key;

/// Keeps content in a concurrent map. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStorage {
    blobs: Arc<DashMap<ContentRef, Bytes>>,
}

impl MemoryContentStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn get(&self, content: &ContentRef) -> AppResult<Bytes> {
        self.blobs
            .get(content)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Content not found: {content}")))
    }
}

#[async_trait]
impl ContentStorage for MemoryContentStorage {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn store(&self, data: Bytes, suggested_name: &str) -> AppResult<ContentRef> {
        let content = ContentRef::new(content_key(suggested_name));
        self.blobs.insert(content.clone(), data);
        Ok(content)
    }

    async fn read(&self, content: &ContentRef) -> AppResult<ByteStream> {
        let data = self.get(content)?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn read_bytes(&self, content: &ContentRef) -> AppResult<Bytes> {
        self.get(content)
    }

    async fn delete(&self, content: &ContentRef) -> AppResult<()> {
        self.blobs.remove(content);
        Ok(())
    }

    async fn exists(&self, content: &ContentRef) -> AppResult<bool> {
        Ok(self.blobs.contains_key(content))
    }
}
