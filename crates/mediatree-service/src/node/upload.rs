//! File uploads: validation, content storage, probing, and node insert.

use bytes::Bytes;
use tracing::{info, warn};

use mediatree_core::config::storage::StorageConfig;
use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::NodeId;
use mediatree_database::{Database, NamePolicy, NewNode, NodeRepository, NodeUpdate, TreeRepository};
use mediatree_entity::node::name::{extension_of, validate_name};
use mediatree_entity::{FilePayload, MediaType, Metadata, Node, Placement};
use mediatree_storage::{probe_image, StorageManager};

use crate::context::OperationContext;

/// A single-request upload.
#[derive(Debug, Clone)]
pub struct UploadParams {
    /// Target folder, `None` for a top-level file.
    pub parent_id: Option<NodeId>,
    /// Original file name.
    pub file_name: String,
    /// File content.
    pub data: Bytes,
    /// Initial metadata.
    pub metadata: Metadata,
    /// Where among the folder's children the file goes.
    pub placement: Placement,
}

impl UploadParams {
    /// Upload `data` as `file_name`, appended to `parent_id`.
    pub fn new(parent_id: Option<NodeId>, file_name: impl Into<String>, data: Bytes) -> Self {
        Self {
            parent_id,
            file_name: file_name.into(),
            data,
            metadata: Metadata::default(),
            placement: Placement::Last,
        }
    }
}

/// Stores uploaded content and records it as file nodes.
#[derive(Debug, Clone)]
pub struct UploadService {
    nodes: NodeRepository,
    trees: TreeRepository,
    storage: StorageManager,
    config: StorageConfig,
    policy: NamePolicy,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(db: Database, storage: StorageManager, config: StorageConfig) -> Self {
        Self {
            policy: db.name_policy(),
            nodes: NodeRepository::new(db.clone()),
            trees: TreeRepository::new(db),
            storage,
            config,
        }
    }

    /// Check name, extension whitelist and size before anything is stored.
    /// Returns the lowercase extension.
    pub fn validate(&self, file_name: &str, size: u64) -> AppResult<String> {
        validate_name(file_name).map_err(AppError::validation)?;
        let ext = extension_of(file_name);
        if !self.config.allowed_extensions.is_empty()
            && !self.config.allowed_extensions.iter().any(|e| *e == ext)
        {
            return Err(AppError::validation(format!(
                "File type '{ext}' is not allowed for '{file_name}'"
            )));
        }
        let max = self.config.max_upload_size_bytes;
        if max > 0 && size > max {
            return Err(AppError::validation(format!(
                "File exceeds maximum upload size of {max} bytes"
            )));
        }
        Ok(ext)
    }

    /// Upload a file into the tree.
    ///
    /// The content is stored first; if the node cannot be inserted the
    /// stored content is deleted again.
    pub async fn upload(&self, ctx: &OperationContext, params: UploadParams) -> AppResult<Node> {
        let size = params.data.len() as u64;
        let ext = self.validate(&params.file_name, size)?;
        if let Some(parent_id) = params.parent_id {
            let parent = self.trees.get(parent_id).await?;
            if !parent.is_folder() {
                return Err(AppError::invalid_target(format!(
                    "Cannot upload into '{}' ({}): it is a file",
                    parent.name, parent.id
                )));
            }
        }

        let probed = probe_image(params.data.clone(), &ext).await?;
        let content = self
            .storage
            .store_upload(params.data, &params.file_name)
            .await?;

        let payload = FilePayload {
            content: content.clone(),
            size,
            mime_type: probed.mime_type,
            media_type: probed.media_type,
            extension: ext,
            dimensions: probed.dimensions,
            preview: None,
        };
        let new = NewNode::file(params.parent_id, params.file_name, payload)
            .with_metadata(params.metadata)
            .at(params.placement);

        match self
            .nodes
            .insert(new, &ctx.policy(&self.policy), ctx.actor())
            .await
        {
            Ok(node) => {
                info!(
                    request_id = %ctx.request_id,
                    node_id = %node.id,
                    name = %node.name,
                    content = %content,
                    size,
                    media_type = %node.media_type(),
                    "File uploaded"
                );
                Ok(node)
            }
            Err(e) => {
                warn!(request_id = %ctx.request_id, content = %content, error = %e, "Insert failed, discarding stored content");
                self.storage.release(&[content]).await;
                Err(e)
            }
        }
    }

    /// Attach a preview image to a file, replacing any previous one.
    pub async fn attach_preview(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        file_name: &str,
        data: Bytes,
    ) -> AppResult<Node> {
        let ext = self.validate(file_name, data.len() as u64)?;
        let probed = probe_image(data.clone(), &ext).await?;
        if probed.media_type != MediaType::SupportedImage {
            return Err(AppError::validation(format!(
                "Preview '{file_name}' is not a readable image"
            )));
        }

        let content = self.storage.store_preview(data, file_name).await?;
        let update = NodeUpdate {
            preview: Some(Some(content.clone())),
            ..NodeUpdate::default()
        };
        match self
            .nodes
            .update(id, update, &ctx.policy(&self.policy), ctx.actor())
            .await
        {
            Ok((node, report)) => {
                self.storage.release(&report.released).await;
                info!(request_id = %ctx.request_id, node_id = %id, preview = %content, "Preview attached");
                Ok(node)
            }
            Err(e) => {
                self.storage.release(&[content]).await;
                Err(e)
            }
        }
    }
}
