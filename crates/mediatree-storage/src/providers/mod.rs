//! Content storage provider implementations.

pub mod local;
pub mod memory;

pub use local::LocalContentStorage;
pub use memory::MemoryContentStorage;

use uuid::Uuid;

use mediatree_entity::node::name::extension_of;

/// Derive a fresh storage key from a name hint.
///
/// `upload/Beach Day.JPG` becomes `upload/<uuid>.jpg`: the directory part
/// of the hint is kept and the file name is replaced so that keys never
/// collide and never carry user-controlled path segments.
pub(crate) fn content_key(suggested_name: &str) -> String {
    let (dir, file) = match suggested_name.trim_start_matches('/').rsplit_once('/') {
        Some((dir, file)) => (sanitize_dir(dir), file),
        None => (String::new(), suggested_name),
    };
    let ext = extension_of(file);
    let mut key = dir;
    if !key.is_empty() {
        key.push('/');
    }
    key.push_str(&Uuid::new_v4().simple().to_string());
    if !ext.is_empty() {
        key.push('.');
        key.push_str(&ext);
    }
    key
}

fn sanitize_dir(dir: &str) -> String {
    dir.split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}
