//! Sessions, principals and the effective-permission computation.
//!
//! The permission check is a plain set-membership test over the role
//! grants loaded for a user. Nothing here touches storage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{UserRoleGrants, UserWithRoles};

/// An authenticated session as handed over by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// A role as seen by the authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRole {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<String>,
}

/// The resolved identity of the current caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub roles: Vec<PrincipalRole>,
}

impl Principal {
    /// True if any of the principal's roles grants `permission`.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.roles
            .iter()
            .any(|role| role.permissions.iter().any(|p| p == permission))
    }

    /// Union of permission names over every role. Recomputed on each call.
    pub fn effective_permissions(&self) -> BTreeSet<String> {
        self.roles
            .iter()
            .flat_map(|role| role.permissions.iter().cloned())
            .collect()
    }

    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|r| r.name.as_str()).collect()
    }
}

impl From<UserRoleGrants> for PrincipalRole {
    fn from(grants: UserRoleGrants) -> Self {
        Self {
            id: grants.role_id,
            name: grants.role_name,
            permissions: grants.permissions,
        }
    }
}

impl From<UserWithRoles> for Principal {
    fn from(loaded: UserWithRoles) -> Self {
        Self {
            id: loaded.user.id,
            full_name: loaded.user.full_name,
            email: loaded.user.email,
            roles: loaded.roles.into_iter().map(PrincipalRole::from).collect(),
        }
    }
}
