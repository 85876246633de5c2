//! Capability traits implemented by nodes that carry a file payload.

use mediatree_core::types::ContentRef;

use super::model::{Dimensions, FilePayload, Node};

/// Content with known pixel dimensions.
pub trait HasImageDimensions {
    /// Pixel dimensions, when the content is a supported image.
    fn dimensions(&self) -> Option<Dimensions>;

    /// `WIDTH×HEIGHT`, or an empty string when unknown.
    fn resolution_formatted(&self) -> String {
        self.dimensions()
            .map(|d| d.formatted())
            .unwrap_or_default()
    }
}

/// Content with a preview asset.
pub trait HasPreview {
    /// The dedicated preview image, if one was attached.
    fn preview(&self) -> Option<&ContentRef>;

    /// The asset to render as a preview: the dedicated preview, else the
    /// content itself when it is a supported image.
    fn preview_source(&self) -> Option<&ContentRef>;
}

impl HasImageDimensions for FilePayload {
    fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }
}

impl HasPreview for FilePayload {
    fn preview(&self) -> Option<&ContentRef> {
        self.preview.as_ref()
    }

    fn preview_source(&self) -> Option<&ContentRef> {
        self.preview.as_ref().or_else(|| {
            (self.media_type == super::MediaType::SupportedImage).then_some(&self.content)
        })
    }
}

impl HasImageDimensions for Node {
    fn dimensions(&self) -> Option<Dimensions> {
        self.payload().and_then(|p| p.dimensions)
    }
}

impl HasPreview for Node {
    fn preview(&self) -> Option<&ContentRef> {
        self.payload().and_then(|p| p.preview.as_ref())
    }

    fn preview_source(&self) -> Option<&ContentRef> {
        self.payload().and_then(|p| p.preview_source())
    }
}
