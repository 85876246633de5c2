//! Structural mutations with content release after commit.

use tracing::info;

use mediatree_core::result::AppResult;
use mediatree_core::types::{ContentRef, NodeId, TreeId};
use mediatree_database::{Database, DeleteReport, MutationEngine, NamePolicy, RebuildReport};
use mediatree_entity::{Node, Placement};
use mediatree_storage::StorageManager;

use crate::context::OperationContext;

/// Move, copy, delete and rebuild.
#[derive(Debug, Clone)]
pub struct MutationService {
    engine: MutationEngine,
    storage: StorageManager,
    policy: NamePolicy,
}

impl MutationService {
    /// Creates a new mutation service.
    pub fn new(db: Database, storage: StorageManager) -> Self {
        Self {
            policy: db.name_policy(),
            engine: MutationEngine::new(db),
            storage,
        }
    }

    /// Move a node under `target` (`None` for the top level).
    pub async fn move_node(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        target: Option<NodeId>,
        placement: Placement,
    ) -> AppResult<Node> {
        self.engine
            .move_node(id, target, placement, &ctx.policy(&self.policy), ctx.actor())
            .await
    }

    /// Copy a node and its subtree under `target`.
    pub async fn copy_node(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        target: Option<NodeId>,
        placement: Placement,
    ) -> AppResult<Node> {
        self.engine
            .copy_node(id, target, placement, &ctx.policy(&self.policy), ctx.actor())
            .await
    }

    /// Delete a subtree, then release content no row references anymore.
    pub async fn delete(&self, ctx: &OperationContext, id: NodeId) -> AppResult<DeleteReport> {
        let report = self.engine.delete(id).await?;
        self.release(ctx, &report).await;
        Ok(report)
    }

    /// Delete several subtrees in one transaction.
    pub async fn delete_many(
        &self,
        ctx: &OperationContext,
        ids: &[NodeId],
    ) -> AppResult<DeleteReport> {
        let report = self.engine.delete_many(ids).await?;
        self.release(ctx, &report).await;
        Ok(report)
    }

    /// Delete several subtrees but keep their content. The caller passes
    /// `report.released` to [`Self::release_content`] once the deletion is
    /// durable.
    pub async fn delete_many_retaining(&self, ids: &[NodeId]) -> AppResult<DeleteReport> {
        self.engine.delete_many(ids).await
    }

    /// Delete content no row references anymore. Returns how many deletes
    /// failed; failures are logged and never undo the mutation.
    pub async fn release_content(&self, ctx: &OperationContext, released: &[ContentRef]) -> usize {
        if released.is_empty() {
            return 0;
        }
        let failed = self.storage.release(released).await;
        info!(
            request_id = %ctx.request_id,
            released = released.len(),
            failed,
            "Released content of deleted nodes"
        );
        failed
    }

    /// Recompute every tree from parent pointers.
    pub async fn rebuild(&self, ctx: &OperationContext) -> AppResult<RebuildReport> {
        let report = self.engine.rebuild().await?;
        info!(request_id = %ctx.request_id, changed = report.changed, "Rebuild requested");
        Ok(report)
    }

    /// Recompute one tree from parent pointers.
    pub async fn rebuild_tree(
        &self,
        ctx: &OperationContext,
        tree: TreeId,
    ) -> AppResult<RebuildReport> {
        let report = self.engine.rebuild_tree(tree).await?;
        info!(request_id = %ctx.request_id, tree_id = %tree, changed = report.changed, "Tree rebuild requested");
        Ok(report)
    }

    async fn release(&self, ctx: &OperationContext, report: &DeleteReport) {
        self.release_content(ctx, &report.released).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use mediatree_core::config::storage::StorageConfig;
    use mediatree_core::config::tree::TreeConfig;
    use mediatree_core::traits::storage::ContentStorage;
    use mediatree_storage::MemoryContentStorage;

    use super::*;
    use crate::node::{NodeService, UploadParams, UploadService};

    #[tokio::test]
    async fn test_shared_content_outlives_one_copy() {
        let db = Database::in_memory(TreeConfig::default());
        let blobs = MemoryContentStorage::new();
        let config = StorageConfig::default();
        let storage = StorageManager::with_provider(Arc::new(blobs.clone()), &config);
        let nodes = NodeService::new(db.clone(), storage.clone());
        let uploads = UploadService::new(db.clone(), storage.clone(), config);
        let mutations = MutationService::new(db, storage);
        let ctx = OperationContext::system();

        let a = nodes.create_folder(&ctx, None, "A", Placement::Last).await.unwrap();
        let file = uploads
            .upload(&ctx, UploadParams::new(Some(a.id), "notes.txt", Bytes::from_static(b"hi")))
            .await
            .unwrap();
        let content = file.payload().unwrap().content.clone();
        let copy = mutations
            .copy_node(&ctx, a.id, None, Placement::Last)
            .await
            .unwrap();
        assert_eq!(copy.name, "A_2");

        let first = mutations.delete(&ctx, a.id).await.unwrap();
        assert!(first.released.is_empty());
        assert!(blobs.exists(&content).await.unwrap());

        let second = mutations.delete(&ctx, copy.id).await.unwrap();
        assert_eq!(second.released, vec![content.clone()]);
        assert!(!blobs.exists(&content).await.unwrap());
    }

    #[tokio::test]
    async fn test_retaining_delete_keeps_content_until_released() {
        let db = Database::in_memory(TreeConfig::default());
        let blobs = MemoryContentStorage::new();
        let config = StorageConfig::default();
        let storage = StorageManager::with_provider(Arc::new(blobs.clone()), &config);
        let nodes = NodeService::new(db.clone(), storage.clone());
        let uploads = UploadService::new(db.clone(), storage.clone(), config);
        let mutations = MutationService::new(db.clone(), storage);
        let ctx = OperationContext::system();

        let a = nodes.create_folder(&ctx, None, "A", Placement::Last).await.unwrap();
        let file = uploads
            .upload(&ctx, UploadParams::new(Some(a.id), "notes.txt", Bytes::from_static(b"hi")))
            .await
            .unwrap();
        let content = file.payload().unwrap().content.clone();

        let report = mutations.delete_many_retaining(&[a.id]).await.unwrap();
        assert_eq!(report.released, vec![content.clone()]);
        assert_eq!(db.node_count().await, 0);
        assert!(blobs.exists(&content).await.unwrap());

        let failed = mutations.release_content(&ctx, &report.released).await;
        assert_eq!(failed, 0);
        assert!(!blobs.exists(&content).await.unwrap());
    }
}
