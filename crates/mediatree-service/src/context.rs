//! Per-operation context passed explicitly through the service layer.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use mediatree_database::NamePolicy;

/// Who is acting and how sibling name collisions are handled for this
/// one operation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Correlation id for log lines of this operation.
    pub request_id: Uuid,
    /// The acting user, recorded in `created_by`/`modified_by`.
    pub actor: Option<String>,
    /// Overrides the configured naming policy when set.
    pub name_policy: Option<NamePolicy>,
    /// When the operation started.
    pub request_time: DateTime<Utc>,
}

impl OperationContext {
    /// Context for a named actor.
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            ..Self::system()
        }
    }

    /// Context for maintenance work with no acting user.
    pub fn system() -> Self {
        Self {
            request_id: Uuid::now_v7(),
            actor: None,
            name_policy: None,
            request_time: Utc::now(),
        }
    }

    /// Fail with `NameCollision` instead of numbering colliding names.
    pub fn rejecting_collisions(mut self) -> Self {
        self.name_policy = Some(NamePolicy::Reject);
        self
    }

    /// Use an explicit naming policy.
    pub fn with_name_policy(mut self, policy: NamePolicy) -> Self {
        self.name_policy = Some(policy);
        self
    }

    /// The acting user as a string slice.
    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    /// The naming policy in force: the override, else `configured`.
    pub fn policy(&self, configured: &NamePolicy) -> NamePolicy {
        self.name_policy
            .clone()
            .unwrap_or_else(|| configured.clone())
    }
}
