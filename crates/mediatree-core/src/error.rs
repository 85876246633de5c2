//! Unified error types for the media tree.
//!
//! Every crate maps its failures into [`AppError`] so that structural
//! errors reach the caller unmodified through the `?` operator.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A path or id lookup missed.
    NotFound,
    /// A move/copy/create target is invalid (cycle or wrong-kind parent).
    InvalidTarget,
    /// A sibling already carries the requested name and numbering is disabled.
    NameCollision,
    /// Nested-set bounds violate the tree invariants.
    TreeCorruption,
    /// A tree lock could not be acquired in time.
    ConcurrentModification,
    /// More than one sibling matched a path component.
    AmbiguousPath,
    /// Input validation failed (file type, size, empty name, ...).
    Validation,
    /// The content storage collaborator failed.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InvalidTarget => write!(f, "INVALID_TARGET"),
            Self::NameCollision => write!(f, "NAME_COLLISION"),
            Self::TreeCorruption => write!(f, "TREE_CORRUPTION"),
            Self::ConcurrentModification => write!(f, "CONCURRENT_MODIFICATION"),
            Self::AmbiguousPath => write!(f, "AMBIGUOUS_PATH"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout the media tree.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an invalid-target error.
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTarget, message)
    }

    /// Create a name-collision error.
    pub fn name_collision(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NameCollision, message)
    }

    /// Create a tree-corruption error.
    pub fn tree_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TreeCorruption, message)
    }

    /// Create a concurrent-modification error.
    pub fn concurrent_modification(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConcurrentModification, message)
    }

    /// Create an ambiguous-path error.
    pub fn ambiguous_path(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AmbiguousPath, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the caller may retry the whole operation.
    ///
    /// Only lock contention qualifies. The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::ConcurrentModification
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
