//! Node entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mediatree_core::types::{ContentRef, NodeId, TreeId};

use super::media_type::MediaType;
use super::name::slugify;

/// A file or folder row in the node table.
///
/// `tree_id`, `left`, `right` and `depth` form the nested-set encoding and
/// are only ever written by the tree engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier, stable across moves.
    pub id: NodeId,
    /// Parent folder (None for top-level nodes).
    pub parent_id: Option<NodeId>,
    /// Name, unique among siblings.
    pub name: String,
    /// The disjoint tree this node belongs to.
    pub tree_id: TreeId,
    /// Nested-set left bound.
    pub left: u64,
    /// Nested-set right bound.
    pub right: u64,
    /// Distance from the tree root (root = 0).
    pub depth: u32,
    /// Manual sibling ordering, independent of the bounds.
    #[serde(default)]
    pub position: i32,
    /// Default file flag for folder previews.
    #[serde(default)]
    pub is_default: bool,
    /// Folder or file with its payload.
    pub kind: NodeKind,
    /// Descriptive metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Whether a node is a folder or a file. Only files carry a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A folder that may hold children.
    Folder,
    /// A file with stored content.
    File(FilePayload),
}

/// Stored content and derived file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePayload {
    /// Reference into the content storage.
    pub content: ContentRef,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Broad media classification.
    pub media_type: MediaType,
    /// Lowercase file extension without the dot.
    pub extension: String,
    /// Pixel dimensions for supported images.
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    /// Optional preview image for media that cannot be rendered directly.
    #[serde(default)]
    pub preview: Option<ContentRef>,
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Format as `WIDTH×HEIGHT`.
    pub fn formatted(&self) -> String {
        format!("{}×{}", self.width, self.height)
    }
}

/// Descriptive metadata kept for every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Author name.
    #[serde(default)]
    pub author: String,
    /// Copyright notice.
    #[serde(default)]
    pub copyright: String,
    /// Free-form keywords.
    #[serde(default)]
    pub keywords: String,
    /// Caption override.
    #[serde(default)]
    pub override_caption: String,
    /// Whether the node is published.
    #[serde(default = "default_true")]
    pub published: bool,
    /// Slug derived from the name.
    #[serde(default)]
    pub slug: String,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last modified.
    pub modified_at: DateTime<Utc>,
    /// Actor that created the node.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Actor that last modified the node.
    #[serde(default)]
    pub modified_by: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            title: String::new(),
            description: String::new(),
            author: String::new(),
            copyright: String::new(),
            keywords: String::new(),
            override_caption: String::new(),
            published: true,
            slug: String::new(),
            created_at: now,
            modified_at: now,
            created_by: None,
            modified_by: None,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Node {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    /// Check if this is a top-level node (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The file payload, if this is a file.
    pub fn payload(&self) -> Option<&FilePayload> {
        match &self.kind {
            NodeKind::File(payload) => Some(payload),
            NodeKind::Folder => None,
        }
    }

    /// Mutable access to the file payload.
    pub fn payload_mut(&mut self) -> Option<&mut FilePayload> {
        match &mut self.kind {
            NodeKind::File(payload) => Some(payload),
            NodeKind::Folder => None,
        }
    }

    /// Broad media classification; folders report [`MediaType::Folder`].
    pub fn media_type(&self) -> MediaType {
        self.payload()
            .map(|p| p.media_type)
            .unwrap_or(MediaType::Folder)
    }

    /// Size in bytes for files.
    pub fn size(&self) -> Option<u64> {
        self.payload().map(|p| p.size)
    }

    /// Every content reference this row holds (file content and preview).
    pub fn content_refs(&self) -> Vec<&ContentRef> {
        match &self.kind {
            NodeKind::Folder => Vec::new(),
            NodeKind::File(payload) => std::iter::once(&payload.content)
                .chain(payload.preview.iter())
                .collect(),
        }
    }

    /// Number of descendants, derived from the bounds alone.
    pub fn descendant_count(&self) -> u64 {
        self.right.saturating_sub(self.left).saturating_sub(1) / 2
    }

    /// Number of bound values the subtree occupies. Inverted bounds
    /// count as a single value.
    pub fn width(&self) -> u64 {
        self.right.saturating_sub(self.left).saturating_add(1)
    }

    /// Whether `other` lies strictly inside this node's bounds.
    pub fn contains(&self, other: &Node) -> bool {
        self.tree_id == other.tree_id && self.left < other.left && other.right < self.right
    }

    /// Whether this node is `other` or one of its descendants.
    pub fn is_within(&self, other: &Node) -> bool {
        self.id == other.id || other.contains(self)
    }

    /// Whether the minimal metadata has been entered.
    ///
    /// Media types that describe themselves (folders, documents, archives,
    /// text) only need a name. Everything else needs a title, a
    /// description, or a caption override.
    pub fn has_metadata(&self) -> bool {
        (self.media_type().is_metadata_less() && !self.name.is_empty())
            || !self.metadata.title.is_empty()
            || !self.metadata.description.is_empty()
            || !self.metadata.override_caption.is_empty()
    }

    /// Stamp the modification and refresh derived fields.
    pub fn touch(&mut self, actor: Option<&str>) {
        self.metadata.slug = slugify(&self.name);
        self.metadata.modified_at = Utc::now();
        self.metadata.modified_by = actor.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(left: u64, right: u64) -> Node {
        Node {
            id: NodeId::new(1),
            parent_id: None,
            name: "photos".to_string(),
            tree_id: TreeId::new(1),
            left,
            right,
            depth: 0,
            position: 0,
            is_default: false,
            kind: NodeKind::Folder,
            metadata: Metadata::default(),
        }
    }

    fn image() -> Node {
        Node {
            id: NodeId::new(2),
            parent_id: Some(NodeId::new(1)),
            name: "beach.jpg".to_string(),
            tree_id: TreeId::new(1),
            left: 2,
            right: 3,
            depth: 1,
            position: 0,
            is_default: false,
            kind: NodeKind::File(FilePayload {
                content: ContentRef::new("upload/abc.jpg"),
                size: 1024,
                mime_type: "image/jpeg".to_string(),
                media_type: MediaType::SupportedImage,
                extension: "jpg".to_string(),
                dimensions: Some(Dimensions {
                    width: 640,
                    height: 480,
                }),
                preview: Some(ContentRef::new("preview/abc.png")),
            }),
            metadata: Metadata::default(),
        }
    }

    #[test]
    fn test_descendant_count_from_bounds() {
        assert_eq!(folder(1, 2).descendant_count(), 0);
        assert_eq!(folder(1, 8).descendant_count(), 3);
        assert_eq!(folder(1, 8).width(), 8);
    }

    #[test]
    fn test_inverted_bounds_do_not_underflow() {
        assert_eq!(folder(3, 2).width(), 1);
        assert_eq!(folder(3, 2).descendant_count(), 0);
    }

    #[test]
    fn test_contains_is_strict() {
        let parent = folder(1, 4);
        let child = image();
        assert!(parent.contains(&child));
        assert!(!child.contains(&parent));
        assert!(!parent.contains(&parent));
        assert!(child.is_within(&parent));
    }

    #[test]
    fn test_content_refs_include_preview() {
        let node = image();
        let refs = node.content_refs();
        assert_eq!(refs.len(), 2);
        assert!(folder(1, 2).content_refs().is_empty());
    }

    #[test]
    fn test_has_metadata_rules() {
        assert!(folder(1, 2).has_metadata());
        let mut photo = image();
        assert!(!photo.has_metadata());
        photo.metadata.title = "Beach at dawn".to_string();
        assert!(photo.has_metadata());
    }

    #[test]
    fn test_kind_serializes_with_tag() {
        let json = serde_json::to_value(&image()).expect("serialize");
        assert_eq!(json["kind"]["type"], "file");
        assert_eq!(json["kind"]["media_type"], "supported_image");
        let back: Node = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, image());
    }
}
