//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub id: Uuid,
    /// Stable external identifier, `<resource>.<action>` (e.g. `users.view`).
    pub name: String,
    pub description: String,
    pub resource_id: Uuid,
    pub action_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub description: String,
    pub resource_id: Uuid,
    pub action_id: Uuid,
}

/// Builds the conventional permission name for a resource/action pair.
pub fn permission_name(resource: &str, action: &str) -> String {
    format!("{}.{}", resource.to_lowercase(), action.to_lowercase())
}

/// Who granted a permission to a role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Grantor {
    User(Uuid),
    /// Bootstrap/seed process.
    System,
}

impl Grantor {
    pub const SYSTEM_MARKER: &'static str = "system";

    pub fn as_stored(&self) -> String {
        match self {
            Grantor::User(id) => id.to_string(),
            Grantor::System => Self::SYSTEM_MARKER.to_string(),
        }
    }

    pub fn parse(stored: &str) -> Option<Self> {
        if stored == Self::SYSTEM_MARKER {
            return Some(Grantor::System);
        }
        Uuid::parse_str(stored).ok().map(Grantor::User)
    }
}

/// A permission grant on a role, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolePermission {
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub granted_by: Grantor,
    pub granted_at: DateTime<Utc>,
}
