//! Opaque references into the content storage collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to stored binary content, as returned by
/// [`ContentStorage::store`](crate::traits::storage::ContentStorage::store).
///
/// The tree engine never interprets the value. Copies of a file node share
/// the same reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Wrap a storage key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The storage key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentRef {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}
