//! Convenience result type alias for the media tree.

use crate::error::AppError;

/// A specialized `Result` type for media tree operations.
pub type AppResult<T> = Result<T, AppError>;
