//! # mediatree-core
//!
//! Core crate for the media tree. Contains the unified error system,
//! configuration schemas, typed identifiers, and the content storage
//! collaborator trait consumed by the tree engine.
//!
//! This crate has **no** internal dependencies on other media tree crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
