//! Folder creation, lookups, and metadata edits.

use tracing::info;

use mediatree_core::result::AppResult;
use mediatree_core::types::NodeId;
use mediatree_database::{Database, NamePolicy, NewNode, NodeRepository, NodeUpdate, TreeRepository};
use mediatree_entity::{MediaType, Node, Placement};
use mediatree_storage::StorageManager;

use crate::context::OperationContext;

/// Node lookups and non-structural edits.
#[derive(Debug, Clone)]
pub struct NodeService {
    nodes: NodeRepository,
    trees: TreeRepository,
    storage: StorageManager,
    policy: NamePolicy,
}

impl NodeService {
    /// Creates a new node service.
    pub fn new(db: Database, storage: StorageManager) -> Self {
        Self {
            policy: db.name_policy(),
            nodes: NodeRepository::new(db.clone()),
            trees: TreeRepository::new(db),
            storage,
        }
    }

    /// Fetch a node by id.
    pub async fn get(&self, id: NodeId) -> AppResult<Node> {
        self.trees.get(id).await
    }

    /// Resolve a `/`-separated path from the forest root.
    pub async fn resolve_path(&self, path: &str) -> AppResult<Node> {
        self.nodes.resolve_path(path).await
    }

    /// Resolve path components below `start`.
    pub async fn resolve(&self, start: Option<NodeId>, components: &[&str]) -> AppResult<Node> {
        self.nodes.resolve(start, components).await
    }

    /// The name a new node would receive under `parent`.
    pub async fn unique_name_under(
        &self,
        ctx: &OperationContext,
        parent: Option<NodeId>,
        desired: &str,
        is_folder: bool,
    ) -> AppResult<String> {
        self.nodes
            .unique_name_under(parent, desired, is_folder, &ctx.policy(&self.policy))
            .await
    }

    /// The file representing a folder.
    pub async fn default_file(
        &self,
        id: NodeId,
        media_types: Option<&[MediaType]>,
    ) -> AppResult<Option<Node>> {
        self.nodes.default_file(id, media_types).await
    }

    /// Create a folder under `parent` (`None` for a new top-level tree).
    pub async fn create_folder(
        &self,
        ctx: &OperationContext,
        parent: Option<NodeId>,
        name: &str,
        placement: Placement,
    ) -> AppResult<Node> {
        let folder = self
            .nodes
            .insert(
                NewNode::folder(parent, name).at(placement),
                &ctx.policy(&self.policy),
                ctx.actor(),
            )
            .await?;
        info!(
            request_id = %ctx.request_id,
            node_id = %folder.id,
            parent_id = ?parent,
            name = %folder.name,
            "Folder created"
        );
        Ok(folder)
    }

    /// Apply field edits and release a detached preview nobody else uses.
    pub async fn update(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        update: NodeUpdate,
    ) -> AppResult<Node> {
        let (node, report) = self
            .nodes
            .update(id, update, &ctx.policy(&self.policy), ctx.actor())
            .await?;
        self.storage.release(&report.released).await;
        info!(request_id = %ctx.request_id, node_id = %id, "Node updated");
        Ok(node)
    }

    /// Rename a node. Returns the node with the name it actually got.
    pub async fn rename(&self, ctx: &OperationContext, id: NodeId, name: &str) -> AppResult<Node> {
        let update = NodeUpdate {
            name: Some(name.to_string()),
            ..NodeUpdate::default()
        };
        self.update(ctx, id, update).await
    }

    /// Make a file the default of its folder.
    pub async fn set_default(&self, ctx: &OperationContext, id: NodeId) -> AppResult<Node> {
        let update = NodeUpdate {
            is_default: Some(true),
            ..NodeUpdate::default()
        };
        self.update(ctx, id, update).await
    }
}
