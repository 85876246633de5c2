//! Node domain entities.

pub mod capability;
pub mod media_type;
pub mod model;
pub mod name;
pub mod placement;

pub use capability::{HasImageDimensions, HasPreview};
pub use media_type::MediaType;
pub use model::{Dimensions, FilePayload, Metadata, Node, NodeKind};
pub use placement::Placement;
