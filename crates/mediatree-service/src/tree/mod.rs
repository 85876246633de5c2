//! Read-only views derived from the tree for presentation callers.

pub mod views;

pub use views::TreeService;
