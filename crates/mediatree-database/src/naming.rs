//! Sibling name uniqueness.

use std::collections::HashSet;

use mediatree_core::config::tree::TreeConfig;
use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_entity::node::name::{numbered_name, split_name};

/// What to do when a desired name is already taken by a sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePolicy {
    /// Append a number using the given format (`{name}_{number}{ext}`).
    Numbered {
        /// Format with `{name}`, `{number}` and `{ext}` placeholders.
        format: String,
    },
    /// Fail with `NameCollision`.
    Reject,
}

impl NamePolicy {
    /// The policy configured for the tree engine.
    pub fn from_config(config: &TreeConfig) -> Self {
        if config.auto_rename {
            Self::Numbered {
                format: config.unique_name_format.clone(),
            }
        } else {
            Self::Reject
        }
    }

    /// Pick a name for a node among `taken` sibling names.
    ///
    /// File names keep their extension chain after the number
    /// (`photo_2.jpg`, `archive_2.tar.gz`); folder names are numbered whole.
    /// Numbering starts at 2 and takes the first free slot.
    pub fn resolve(&self, desired: &str, is_folder: bool, taken: &HashSet<String>) -> AppResult<String> {
        if !taken.contains(desired) {
            return Ok(desired.to_string());
        }
        let format = match self {
            Self::Reject => {
                return Err(AppError::name_collision(format!(
                    "A sibling named '{desired}' already exists"
                )));
            }
            Self::Numbered { format } => format,
        };

        let (stem, ext) = if is_folder {
            (desired, "")
        } else {
            split_name(desired)
        };
        let mut number = 2u32;
        loop {
            let candidate = numbered_name(format, stem, number, ext);
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
            number = number.checked_add(1).ok_or_else(|| {
                AppError::name_collision(format!("No free numbered name for '{desired}'"))
            })?;
        }
    }
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self::from_config(&TreeConfig::default())
    }
}
