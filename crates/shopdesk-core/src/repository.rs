//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Operations documented as atomic
//! must commit every write or none of them.

use uuid::Uuid;

use crate::error::ShopdeskResult;
use crate::models::{
    action::{Action, CreateAction},
    audit::{AuditLogEntry, CreateAuditLogEntry},
    menu::{CreateMenuItem, MenuEntry, MenuItem, UpdateMenuItem},
    permission::{CreatePermission, Grantor, Permission, RolePermission},
    resource::{CreateResource, Resource},
    role::{CreateRole, Role, UpdateRole},
    user::{CreateUser, User, UserWithRoles},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Permission catalog
// ---------------------------------------------------------------------------

pub trait ResourceRepository: Send + Sync {
    fn create(&self, input: CreateResource) -> impl Future<Output = ShopdeskResult<Resource>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = ShopdeskResult<Resource>> + Send;
    fn list(&self) -> impl Future<Output = ShopdeskResult<Vec<Resource>>> + Send;
}

pub trait ActionRepository: Send + Sync {
    fn create(&self, input: CreateAction) -> impl Future<Output = ShopdeskResult<Action>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = ShopdeskResult<Action>> + Send;
    fn list(&self) -> impl Future<Output = ShopdeskResult<Vec<Action>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = ShopdeskResult<Permission>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<Permission>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = ShopdeskResult<Permission>> + Send;
    /// Permissions with the given ids; unknown ids are skipped.
    fn get_by_ids(
        &self,
        ids: &[Uuid],
    ) -> impl Future<Output = ShopdeskResult<Vec<Permission>>> + Send;
    fn list(&self) -> impl Future<Output = ShopdeskResult<Vec<Permission>>> + Send;
    /// Delete a permission and every grant of it. Menu items that link to
    /// it keep the link and fail closed.
    fn delete(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<()>> + Send;

    /// Grant a permission to a role. Granting twice is a no-op.
    fn grant_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        granted_by: Grantor,
    ) -> impl Future<Output = ShopdeskResult<()>> + Send;

    /// Revoke a permission from a role.
    fn revoke_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = ShopdeskResult<()>> + Send;

    /// Get all permissions granted to a role.
    fn get_role_permissions(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = ShopdeskResult<Vec<Permission>>> + Send;

    /// Get the grant rows of a role, provenance included.
    fn get_role_grants(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = ShopdeskResult<Vec<RolePermission>>> + Send;

    /// Atomically revoke `to_remove` and grant `to_add` on a role.
    fn apply_role_permission_diff(
        &self,
        role_id: Uuid,
        to_add: &[Uuid],
        to_remove: &[Uuid],
        granted_by: Grantor,
    ) -> impl Future<Output = ShopdeskResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Roles & users
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = ShopdeskResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<Role>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = ShopdeskResult<Role>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = ShopdeskResult<Role>> + Send;
    /// Atomically strip the role's grants, detach it from every user and
    /// delete the role row.
    fn delete(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = ShopdeskResult<PaginatedResult<Role>>> + Send;
    /// Number of users holding the role.
    fn count_users(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<u64>> + Send;

    /// Assign a role to a user. Assigning twice is a no-op.
    fn assign_to_user(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = ShopdeskResult<()>> + Send;

    /// Remove a role assignment from a user.
    fn unassign_from_user(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = ShopdeskResult<()>> + Send;

    /// Get all roles assigned to a user.
    fn get_user_roles(&self, user_id: Uuid)
    -> impl Future<Output = ShopdeskResult<Vec<Role>>> + Send;

    /// Atomically unassign `to_remove` and assign `to_add` for a user.
    fn apply_user_role_diff(
        &self,
        user_id: Uuid,
        to_add: &[Uuid],
        to_remove: &[Uuid],
    ) -> impl Future<Output = ShopdeskResult<()>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = ShopdeskResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = ShopdeskResult<User>> + Send;
    /// Load a user with roles and the permission names of each role.
    fn get_with_roles(&self, id: Uuid)
    -> impl Future<Output = ShopdeskResult<UserWithRoles>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

pub trait MenuRepository: Send + Sync {
    fn create(&self, input: CreateMenuItem)
    -> impl Future<Output = ShopdeskResult<MenuItem>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<MenuItem>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateMenuItem,
    ) -> impl Future<Output = ShopdeskResult<MenuItem>> + Send;
    /// Atomically move the item's children to its parent and delete it.
    fn delete(&self, id: Uuid) -> impl Future<Output = ShopdeskResult<()>> + Send;
    /// Every item in insertion order, joined with its gating permission.
    fn list_entries(&self) -> impl Future<Output = ShopdeskResult<Vec<MenuEntry>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = ShopdeskResult<AuditLogEntry>> + Send;
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = ShopdeskResult<PaginatedResult<AuditLogEntry>>> + Send;
}
