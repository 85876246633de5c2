//! Node repository: lookups, path resolution, inserts, and field updates.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{ContentRef, NodeId};
use mediatree_entity::node::name::validate_name;
use mediatree_entity::{FilePayload, MediaType, Metadata, Node, NodeKind, Placement};

use crate::database::Database;
use crate::locks::LockPlan;
use crate::naming::NamePolicy;
use crate::nested_set::{check_bounds, children_of, insertion_bound, open_gap, placement_index};
use crate::repositories::tree::{self, lookup};
use crate::transaction::{CommitReport, TreeTransaction};

/// A node to insert.
#[derive(Debug, Clone)]
pub struct NewNode {
    /// Parent folder, `None` for a new top-level node.
    pub parent_id: Option<NodeId>,
    /// Desired name; numbered on collision per the naming policy.
    pub name: String,
    /// Folder or file payload.
    pub kind: NodeKind,
    /// Initial metadata.
    pub metadata: Metadata,
    /// Where among the parent's children the node goes.
    pub placement: Placement,
}

impl NewNode {
    /// A folder with default metadata, appended to its parent.
    pub fn folder(parent_id: Option<NodeId>, name: impl Into<String>) -> Self {
        Self {
            parent_id,
            name: name.into(),
            kind: NodeKind::Folder,
            metadata: Metadata::default(),
            placement: Placement::Last,
        }
    }

    /// A file with default metadata, appended to its parent.
    pub fn file(parent_id: Option<NodeId>, name: impl Into<String>, payload: FilePayload) -> Self {
        Self {
            parent_id,
            name: name.into(),
            kind: NodeKind::File(payload),
            metadata: Metadata::default(),
            placement: Placement::Last,
        }
    }

    /// Replace the initial metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Insert at a specific placement.
    pub fn at(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

/// Field edits that never touch the nested-set encoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeUpdate {
    /// New name.
    pub name: Option<String>,
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New author.
    pub author: Option<String>,
    /// New copyright notice.
    pub copyright: Option<String>,
    /// New keywords.
    pub keywords: Option<String>,
    /// New caption override.
    pub override_caption: Option<String>,
    /// Publish or unpublish.
    pub published: Option<bool>,
    /// New manual sibling position.
    pub position: Option<i32>,
    /// Set or clear the default-file flag.
    pub is_default: Option<bool>,
    /// Attach (`Some(Some(_))`) or detach (`Some(None)`) a preview image.
    #[serde(default, with = "double_option")]
    pub preview: Option<Option<ContentRef>>,
}

impl NodeUpdate {
    /// Whether the update changes the name.
    pub fn renames(&self) -> bool {
        self.name.is_some()
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(
        value: &Option<Option<T>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(inner) => inner.serialize(serializer),
        }
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<T>>, D::Error> {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Repository for node rows.
#[derive(Debug, Clone)]
pub struct NodeRepository {
    db: Database,
}

impl NodeRepository {
    /// Create a new node repository.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Walk a path component by component from `start` (`None` for the
    /// forest root).
    ///
    /// Each component must match exactly one child by exact name. A miss
    /// is `NotFound`; several matches are `AmbiguousPath`.
    pub async fn resolve(&self, start: Option<NodeId>, path: &[&str]) -> AppResult<Node> {
        let state = self.db.table().read().await;
        let mut current: Option<&Node> = match start {
            Some(id) => Some(lookup(&state, id)?),
            None => None,
        };
        for component in path {
            let parent_id = current.map(|n| n.id);
            let matches = state.named_children(parent_id, component);
            let id = match matches.as_slice() {
                [] => {
                    return Err(AppError::not_found(format!(
                        "No node named '{component}' under {}",
                        describe(current)
                    )));
                }
                [id] => *id,
                _ => {
                    return Err(AppError::ambiguous_path(format!(
                        "{} nodes named '{component}' under {}",
                        matches.len(),
                        describe(current)
                    )));
                }
            };
            let child = lookup(&state, id)?;
            if let Some(parent) = current {
                if !parent.contains(child) {
                    return Err(AppError::tree_corruption(format!(
                        "Node {} points at parent {} but lies outside its bounds",
                        child.id, parent.id
                    )));
                }
            }
            current = Some(child);
        }
        current
            .cloned()
            .ok_or_else(|| AppError::not_found("An empty path does not name a node"))
    }

    /// Resolve a `/`-separated path from the forest root.
    pub async fn resolve_path(&self, path: &str) -> AppResult<Node> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        self.resolve(None, &components).await
    }

    /// The name a node would get under `parent` right now. Inserts and
    /// renames repeat this inside their own transaction.
    pub async fn unique_name_under(
        &self,
        parent: Option<NodeId>,
        desired: &str,
        is_folder: bool,
        policy: &NamePolicy,
    ) -> AppResult<String> {
        let state = self.db.table().read().await;
        let taken: HashSet<String> = match parent {
            Some(id) => tree::children_of(&state, lookup(&state, id)?)?
                .into_iter()
                .map(|n| n.name.clone())
                .collect(),
            None => state.roots().into_iter().map(|n| n.name.clone()).collect(),
        };
        policy.resolve(desired, is_folder, &taken)
    }

    /// The file shown for a folder: the child flagged default, else the
    /// first file child, optionally restricted to some media types.
    ///
    /// A file is its own default.
    pub async fn default_file(
        &self,
        id: NodeId,
        media_types: Option<&[MediaType]>,
    ) -> AppResult<Option<Node>> {
        let state = self.db.table().read().await;
        let node = lookup(&state, id)?;
        if node.is_file() {
            return Ok(Some(node.clone()));
        }
        let candidates: Vec<&Node> = tree::children_of(&state, node)?
            .into_iter()
            .filter(|c| c.is_file())
            .filter(|c| media_types.is_none_or(|types| types.contains(&c.media_type())))
            .collect();
        Ok(candidates
            .iter()
            .find(|c| c.is_default)
            .or_else(|| candidates.first())
            .map(|c| (*c).clone()))
    }

    /// Insert a node as a leaf of its parent (or as a new one-node tree).
    pub async fn insert(
        &self,
        new: NewNode,
        policy: &NamePolicy,
        actor: Option<&str>,
    ) -> AppResult<Node> {
        validate_name(&new.name).map_err(AppError::validation)?;
        let parent_id = new.parent_id;
        let mut tx = self
            .db
            .begin(|state| match parent_id {
                Some(id) => Ok(LockPlan::trees([lookup(state, id)?.tree_id])),
                None => Ok(LockPlan::default().with_top_level(true)),
            })
            .await?;
        let node = insert_in(&mut tx, new, policy, actor)?;
        tx.commit().await?;
        debug!(node_id = %node.id, tree_id = %node.tree_id, name = %node.name, "Node inserted");
        Ok(node)
    }

    /// Apply field edits. Bounds are never touched here.
    pub async fn update(
        &self,
        id: NodeId,
        update: NodeUpdate,
        policy: &NamePolicy,
        actor: Option<&str>,
    ) -> AppResult<(Node, CommitReport)> {
        if let Some(name) = &update.name {
            validate_name(name).map_err(AppError::validation)?;
        }
        let renames = update.renames();
        let mut tx = self
            .db
            .begin(|state| {
                let node = lookup(state, id)?;
                Ok(LockPlan::trees([node.tree_id]).with_top_level(renames && node.is_root()))
            })
            .await?;

        let current = tx.get(id)?.clone();
        let mut node = current.clone();

        if let Some(name) = update.name {
            node.name =
                tx.unique_name_under(node.parent_id, &name, node.is_folder(), Some(id), policy)?;
        }
        let meta = &mut node.metadata;
        apply(&mut meta.title, update.title);
        apply(&mut meta.description, update.description);
        apply(&mut meta.author, update.author);
        apply(&mut meta.copyright, update.copyright);
        apply(&mut meta.keywords, update.keywords);
        apply(&mut meta.override_caption, update.override_caption);
        apply(&mut meta.published, update.published);
        apply(&mut node.position, update.position);

        if let Some(preview) = update.preview {
            let payload = node.payload_mut().ok_or_else(|| {
                AppError::validation(format!("Folder {id} cannot carry a preview image"))
            })?;
            payload.preview = preview;
        }

        if let Some(is_default) = update.is_default {
            if is_default {
                mark_default(&mut tx, &node)?;
            }
            node.is_default = is_default;
        }

        node.touch(actor);
        tx.put(node.clone())?;
        let report = tx.commit().await?;
        debug!(node_id = %id, "Node updated");
        Ok((node, report))
    }
}

fn apply<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn describe(node: Option<&Node>) -> String {
    match node {
        Some(node) => format!("'{}' ({})", node.name, node.id),
        None => "the top level".to_string(),
    }
}

/// Clear the default flag on every sibling of `node`.
fn mark_default(tx: &mut TreeTransaction, node: &Node) -> AppResult<()> {
    if !node.is_file() {
        return Err(AppError::validation(format!(
            "Only files can be a folder's default (node {} is a folder)",
            node.id
        )));
    }
    let parent_id = node.parent_id.ok_or_else(|| {
        AppError::invalid_target(format!("Top-level node {} has no folder to be default for", node.id))
    })?;
    let parent = tx.get(parent_id)?.clone();
    let siblings: Vec<NodeId> = tx
        .children(&parent)
        .into_iter()
        .filter(|c| c.id != node.id && c.is_default)
        .map(|c| c.id)
        .collect();
    for sibling in siblings {
        tx.get_mut(sibling)?.is_default = false;
    }
    Ok(())
}

/// Insert `new` inside an open transaction.
pub(crate) fn insert_in(
    tx: &mut TreeTransaction,
    new: NewNode,
    policy: &NamePolicy,
    actor: Option<&str>,
) -> AppResult<Node> {
    let is_folder = matches!(new.kind, NodeKind::Folder);
    let name = tx.unique_name_under(new.parent_id, &new.name, is_folder, None, policy)?;
    let id = tx.allocate_node_id();

    let mut metadata = new.metadata;
    metadata.created_by = actor.map(str::to_string);

    let (tree_id, left, depth) = match new.parent_id {
        Some(parent_id) => {
            let parent = tx.get(parent_id)?.clone();
            check_bounds(&parent)?;
            if !parent.is_folder() {
                return Err(AppError::invalid_target(format!(
                    "'{}' ({}) is a file and cannot hold children",
                    parent.name, parent.id
                )));
            }
            let rows = tx.rows_mut();
            let at = {
                let children = children_of(rows, &parent);
                let index = placement_index(&children, new.placement)?;
                insertion_bound(&parent, &children, index)
            };
            open_gap(rows, parent.tree_id, at, 2);
            (parent.tree_id, at, parent.depth + 1)
        }
        None => {
            if new.placement != Placement::Last {
                return Err(AppError::invalid_target(
                    "Top-level nodes can only be appended after the last tree",
                ));
            }
            (tx.allocate_tree()?, 1, 0)
        }
    };

    let mut node = Node {
        id,
        parent_id: new.parent_id,
        name,
        tree_id,
        left,
        right: left + 1,
        depth,
        position: 0,
        is_default: false,
        kind: new.kind,
        metadata,
    };
    node.touch(actor);
    tx.put(node.clone())?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatree_core::config::tree::TreeConfig;
    use mediatree_core::error::ErrorKind;

    use crate::repositories::TreeRepository;

    fn payload(content: &str, media_type: MediaType) -> FilePayload {
        FilePayload {
            content: ContentRef::new(content),
            size: 10,
            mime_type: "image/png".to_string(),
            media_type,
            extension: "png".to_string(),
            dimensions: None,
            preview: None,
        }
    }

    async fn setup() -> (NodeRepository, TreeRepository, NamePolicy) {
        let db = Database::in_memory(TreeConfig::default());
        let policy = db.name_policy();
        (NodeRepository::new(db.clone()), TreeRepository::new(db), policy)
    }

    #[tokio::test]
    async fn test_insert_and_resolve() {
        let (nodes, trees, policy) = setup().await;
        let photos = nodes
            .insert(NewNode::folder(None, "photos"), &policy, Some("alice"))
            .await
            .expect("photos");
        let trip = nodes
            .insert(NewNode::folder(Some(photos.id), "trip"), &policy, None)
            .await
            .expect("trip");
        assert_eq!((trip.left, trip.right, trip.depth), (2, 3, 1));
        assert_eq!(trees.get(photos.id).await.expect("root").right, 4);

        let found = nodes.resolve_path("photos/trip").await.expect("resolve");
        assert_eq!(found.id, trip.id);
        let err = nodes.resolve_path("photos/missing").await.expect_err("miss");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_insert_numbers_duplicates() {
        let (nodes, _, policy) = setup().await;
        let root = nodes
            .insert(NewNode::folder(None, "root"), &policy, None)
            .await
            .expect("root");
        for expected in ["a.png", "a_2.png", "a_3.png"] {
            let file = nodes
                .insert(
                    NewNode::file(Some(root.id), "a.png", payload("x", MediaType::Image)),
                    &policy,
                    None,
                )
                .await
                .expect("file");
            assert_eq!(file.name, expected);
        }
        let err = nodes
            .insert(
                NewNode::file(Some(root.id), "a.png", payload("x", MediaType::Image)),
                &NamePolicy::Reject,
                None,
            )
            .await
            .expect_err("reject");
        assert_eq!(err.kind, ErrorKind::NameCollision);
    }

    #[tokio::test]
    async fn test_files_cannot_hold_children() {
        let (nodes, _, policy) = setup().await;
        let file = nodes
            .insert(NewNode::file(None, "a.png", payload("x", MediaType::Image)), &policy, None)
            .await
            .expect("file");
        let err = nodes
            .insert(NewNode::folder(Some(file.id), "inner"), &policy, None)
            .await
            .expect_err("file parent");
        assert_eq!(err.kind, ErrorKind::InvalidTarget);
    }

    #[tokio::test]
    async fn test_default_file_prefers_flag() {
        let (nodes, _, policy) = setup().await;
        let root = nodes
            .insert(NewNode::folder(None, "root"), &policy, None)
            .await
            .expect("root");
        let first = nodes
            .insert(
                NewNode::file(Some(root.id), "doc.pdf", payload("d", MediaType::Document)),
                &policy,
                None,
            )
            .await
            .expect("doc");
        let picture = nodes
            .insert(
                NewNode::file(Some(root.id), "pic.png", payload("p", MediaType::SupportedImage)),
                &policy,
                None,
            )
            .await
            .expect("pic");

        let fallback = nodes.default_file(root.id, None).await.expect("default");
        assert_eq!(fallback.map(|n| n.id), Some(first.id));

        let images = [MediaType::SupportedImage];
        let filtered = nodes.default_file(root.id, Some(&images[..])).await.expect("filtered");
        assert_eq!(filtered.map(|n| n.id), Some(picture.id));

        let update = NodeUpdate {
            is_default: Some(true),
            ..NodeUpdate::default()
        };
        nodes.update(picture.id, update, &policy, None).await.expect("flag");
        let flagged = nodes.default_file(root.id, None).await.expect("default");
        assert_eq!(flagged.map(|n| n.id), Some(picture.id));
    }

    #[tokio::test]
    async fn test_rename_collision_and_preview_release() {
        let (nodes, _, policy) = setup().await;
        let root = nodes
            .insert(NewNode::folder(None, "root"), &policy, None)
            .await
            .expect("root");
        nodes
            .insert(NewNode::folder(Some(root.id), "a"), &policy, None)
            .await
            .expect("a");
        let mut with_preview = payload("v", MediaType::Video);
        with_preview.preview = Some(ContentRef::new("prev-1"));
        let video = nodes
            .insert(NewNode::file(Some(root.id), "clip.mp4", with_preview), &policy, None)
            .await
            .expect("video");

        let rename = NodeUpdate {
            name: Some("a".to_string()),
            preview: Some(Some(ContentRef::new("prev-2"))),
            ..NodeUpdate::default()
        };
        let (renamed, report) = nodes
            .update(video.id, rename, &policy, None)
            .await
            .expect("update");
        assert_eq!(renamed.name, "a_2");
        assert_eq!(report.released, vec![ContentRef::new("prev-1")]);
        assert_eq!((renamed.left, renamed.right), (video.left, video.right));
    }

    #[tokio::test]
    async fn test_resolve_reports_duplicate_siblings_as_ambiguous() {
        let (nodes, _, policy) = setup().await;
        let photos = nodes
            .insert(NewNode::folder(None, "photos"), &policy, None)
            .await
            .expect("photos");
        let trip = nodes
            .insert(NewNode::folder(Some(photos.id), "trip"), &policy, None)
            .await
            .expect("trip");

        {
            let mut state = nodes.db.table().write().await;
            let mut twin = trip.clone();
            twin.id = NodeId::new(trip.id.get() + 100);
            state.upsert(twin);
        }

        let err = nodes.resolve_path("photos/trip").await.expect_err("ambiguous");
        assert_eq!(err.kind, ErrorKind::AmbiguousPath);
        let found = nodes.resolve_path("photos").await.expect("unique prefix");
        assert_eq!(found.id, photos.id);
    }
}
