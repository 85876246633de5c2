//! Storage manager: builds the configured provider and releases content
//! the tree no longer references.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use mediatree_core::config::storage::StorageConfig;
use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::traits::storage::ContentStorage;
use mediatree_core::types::ContentRef;

use crate::providers::{LocalContentStorage, MemoryContentStorage};

/// Owns the active content storage provider.
#[derive(Debug, Clone)]
pub struct StorageManager {
    provider: Arc<dyn ContentStorage>,
    upload_subdir: String,
    preview_subdir: String,
}

impl StorageManager {
    /// Build the provider named by `config.provider`.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let provider: Arc<dyn ContentStorage> = match config.provider.as_str() {
            "local" => Arc::new(LocalContentStorage::new(&config.local.root_path).await?),
            "memory" => Arc::new(MemoryContentStorage::new()),
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider '{other}'"
                )));
            }
        };
        info!(
            provider = provider.provider_type(),
            "Content storage initialized"
        );
        Ok(Self::with_provider(provider, config))
    }

    /// Wrap an existing provider.
    pub fn with_provider(provider: Arc<dyn ContentStorage>, config: &StorageConfig) -> Self {
        Self {
            provider,
            upload_subdir: config.upload_subdir.clone(),
            preview_subdir: config.preview_subdir.clone(),
        }
    }

    /// The active provider.
    pub fn provider(&self) -> &Arc<dyn ContentStorage> {
        &self.provider
    }

    /// Store an uploaded file under the upload directory.
    pub async fn store_upload(&self, data: Bytes, file_name: &str) -> AppResult<ContentRef> {
        self.provider
            .store(data, &format!("{}/{file_name}", self.upload_subdir))
            .await
    }

    /// Store a preview image under the preview directory.
    pub async fn store_preview(&self, data: Bytes, file_name: &str) -> AppResult<ContentRef> {
        self.provider
            .store(data, &format!("{}/{file_name}", self.preview_subdir))
            .await
    }

    /// Delete every reference in `released`. Failures are logged and
    /// counted rather than returned: the rows are already gone.
    pub async fn release(&self, released: &[ContentRef]) -> usize {
        let mut failed = 0;
        for content in released {
            if let Err(e) = self.provider.delete(content).await {
                warn!(content = %content, error = %e, "Failed to release content");
                failed += 1;
            }
        }
        failed
    }

    /// Check the provider.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.provider.health_check().await
    }
}
