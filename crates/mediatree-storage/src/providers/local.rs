//! Local filesystem content storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use mediatree_core::error::{AppError, ErrorKind};
use mediatree_core::result::AppResult;
use mediatree_core::traits::storage::{ByteStream, ContentStorage};
use mediatree_core::types::ContentRef;

use super::content_key;

/// Stores content as files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalContentStorage {
    root: PathBuf,
}

impl LocalContentStorage {
    /// Create a provider rooted at `root_path`, creating the directory.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a content reference to a path inside the root. References that
    /// would escape the root are rejected.
    fn resolve(&self, content: &ContentRef) -> AppResult<PathBuf> {
        let relative = Path::new(content.as_str().trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::validation(format!(
                "Invalid content reference: {content}"
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

fn open_error(content: &ContentRef, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Content not found: {content}"))
    } else {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to read content: {content}"),
            e,
        )
    }
}

#[async_trait]
impl ContentStorage for LocalContentStorage {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.is_dir())
    }

    async fn store(&self, data: Bytes, suggested_name: &str) -> AppResult<ContentRef> {
        let content = ContentRef::new(content_key(suggested_name));
        let full_path = self.resolve(&content)?;
        self.ensure_parent(&full_path).await?;

        fs::write(&full_path, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write content: {content}"),
                e,
            )
        })?;

        debug!(content = %content, bytes = data.len(), "Stored content");
        Ok(content)
    }

    async fn read(&self, content: &ContentRef) -> AppResult<ByteStream> {
        let full_path = self.resolve(content)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| open_error(content, e))?;

        let stream = ReaderStream::new(file);
        Ok(Box::pin(stream.map(|r| r.map(Bytes::from))))
    }

    async fn read_bytes(&self, content: &ContentRef) -> AppResult<Bytes> {
        let full_path = self.resolve(content)?;
        let data = fs::read(&full_path)
            .await
            .map_err(|e| open_error(content, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, content: &ContentRef) -> AppResult<()> {
        let full_path = self.resolve(content)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!(content = %content, "Deleted content");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete content: {content}"),
                e,
            )),
        }
    }

    async fn exists(&self, content: &ContentRef) -> AppResult<bool> {
        let full_path = self.resolve(content)?;
        Ok(fs::try_exists(&full_path).await.unwrap_or(false))
    }
}
