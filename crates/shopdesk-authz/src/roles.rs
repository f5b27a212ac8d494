//! Role administration: role CRUD, role permission sets and user role
//! assignments. Every operation is gated; mutations are audited and
//! invalidate caches.

use std::collections::{BTreeMap, HashSet};

use serde_json::json;
use shopdesk_core::error::{ShopdeskError, ShopdeskResult};
use shopdesk_core::models::permission::{Grantor, Permission};
use shopdesk_core::models::role::{CreateRole, Role, RoleDetail, UpdateRole};
use shopdesk_core::principal::Session;
use shopdesk_core::repository::{
    AuditLogRepository, PaginatedResult, Pagination, PermissionRepository, RoleRepository,
    UserRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditRecorder;
use crate::cache::{CacheInvalidator, Invalidation};
use crate::gate::AuthorizationGate;
use crate::result::ActionResult;

const MIN_FIELD_LEN: usize = 2;

fn validate_field(field: &str, value: &str) -> ShopdeskResult<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() < MIN_FIELD_LEN {
        return Err(ShopdeskError::validation(format!(
            "{field} must be at least {MIN_FIELD_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// `(to_add, to_remove)` turning `current` into `desired`, in `desired`
/// and `current` order respectively.
fn diff_ids(current: &[Uuid], desired: &[Uuid]) -> (Vec<Uuid>, Vec<Uuid>) {
    let current_set: HashSet<_> = current.iter().collect();
    let desired_set: HashSet<_> = desired.iter().collect();

    let mut seen = HashSet::new();
    let to_add = desired
        .iter()
        .filter(|id| !current_set.contains(id) && seen.insert(**id))
        .copied()
        .collect();
    let to_remove = current
        .iter()
        .filter(|id| !desired_set.contains(id))
        .copied()
        .collect();
    (to_add, to_remove)
}

/// `ids` without repeats, first occurrence wins.
fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn role_snapshot(role: &Role) -> serde_json::Value {
    json!({ "name": role.name, "description": role.description })
}

/// Role administration service.
///
/// Generic over repository implementations so that this layer has no
/// dependency on the database crate.
pub struct RoleService<R, P, U, A>
where
    R: RoleRepository,
    P: PermissionRepository,
    U: UserRepository,
    A: AuditLogRepository,
{
    roles: R,
    permissions: P,
    gate: AuthorizationGate<U>,
    audit: AuditRecorder<A>,
    invalidator: CacheInvalidator,
}

impl<R, P, U, A> RoleService<R, P, U, A>
where
    R: RoleRepository,
    P: PermissionRepository,
    U: UserRepository,
    A: AuditLogRepository,
{
    pub fn new(
        roles: R,
        permissions: P,
        gate: AuthorizationGate<U>,
        audit: AuditRecorder<A>,
        invalidator: CacheInvalidator,
    ) -> Self {
        Self {
            roles,
            permissions,
            gate,
            audit,
            invalidator,
        }
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    pub async fn create_role(&self, session: Option<&Session>, input: CreateRole) -> ActionResult {
        ActionResult::from_outcome("roles.create", self.try_create_role(session, input).await)
    }

    async fn try_create_role(
        &self,
        session: Option<&Session>,
        input: CreateRole,
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "roles.create", None)
            .await?;

        let name = validate_field("Role name", &input.name)?;
        let description = validate_field("Description", &input.description)?;

        match self.roles.get_by_name(&name).await {
            Ok(_) => return Err(role_name_conflict(&name)),
            Err(ShopdeskError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let role = self
            .roles
            .create(CreateRole { name, description })
            .await
            .map_err(|e| match e {
                ShopdeskError::Conflict { .. } => role_name_conflict(&input.name),
                other => other,
            })?;

        info!(role_id = %role.id, name = %role.name, "Role created");
        self.audit
            .log_audit(
                principal.id,
                "roles.create",
                format!("Created role {}", role.name),
                Some(json!({ "role_id": role.id, "name": role.name })),
            )
            .await;
        self.invalidator.invalidate(Invalidation::Roles).await;

        Ok(format!("Role {} created", role.name))
    }

    pub async fn update_role(
        &self,
        session: Option<&Session>,
        role_id: Uuid,
        input: UpdateRole,
    ) -> ActionResult {
        ActionResult::from_outcome(
            "roles.update",
            self.try_update_role(session, role_id, input).await,
        )
    }

    async fn try_update_role(
        &self,
        session: Option<&Session>,
        role_id: Uuid,
        input: UpdateRole,
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "roles.update", None)
            .await?;

        let name = input
            .name
            .as_deref()
            .map(|n| validate_field("Role name", n))
            .transpose()?;
        let description = input
            .description
            .as_deref()
            .map(|d| validate_field("Description", d))
            .transpose()?;

        let before = self.roles.get_by_id(role_id).await?;

        if let Some(name) = name.as_deref().filter(|n| *n != before.name) {
            match self.roles.get_by_name(name).await {
                Ok(other) if other.id != role_id => return Err(role_name_conflict(name)),
                Ok(_) | Err(ShopdeskError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let after = self
            .roles
            .update(role_id, UpdateRole { name, description })
            .await?;

        self.audit
            .log_audit(
                principal.id,
                "roles.update",
                format!("Updated role {}", after.name),
                Some(json!({
                    "role_id": role_id,
                    "before": role_snapshot(&before),
                    "after": role_snapshot(&after),
                })),
            )
            .await;
        self.invalidator.invalidate(Invalidation::Roles).await;

        Ok(format!("Role {} updated", after.name))
    }

    pub async fn delete_role(&self, session: Option<&Session>, role_id: Uuid) -> ActionResult {
        ActionResult::from_outcome("roles.delete", self.try_delete_role(session, role_id).await)
    }

    async fn try_delete_role(
        &self,
        session: Option<&Session>,
        role_id: Uuid,
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "roles.delete", None)
            .await?;

        let role = self.roles.get_by_id(role_id).await?;
        let user_count = self.roles.count_users(role_id).await?;
        self.roles.delete(role_id).await?;

        info!(%role_id, name = %role.name, user_count, "Role deleted");
        self.audit
            .log_audit(
                principal.id,
                "roles.delete",
                format!("Deleted role {}", role.name),
                Some(json!({
                    "role_id": role_id,
                    "name": role.name,
                    "detached_users": user_count,
                })),
            )
            .await;
        self.invalidator.invalidate(Invalidation::Roles).await;

        Ok(format!("Role {} deleted", role.name))
    }

    /// Replace the role's permission set with `desired`.
    ///
    /// Only the difference is written; untouched grants keep their
    /// provenance. An empty difference writes nothing and is not audited.
    pub async fn update_role_permissions(
        &self,
        session: Option<&Session>,
        role_id: Uuid,
        desired: &[Uuid],
    ) -> ActionResult {
        ActionResult::from_outcome(
            "roles.update_permissions",
            self.try_update_role_permissions(session, role_id, desired)
                .await,
        )
    }

    async fn try_update_role_permissions(
        &self,
        session: Option<&Session>,
        role_id: Uuid,
        desired: &[Uuid],
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "roles.update", None)
            .await?;

        let role = self.roles.get_by_id(role_id).await?;
        let desired = dedup_ids(desired);

        let desired_permissions = self.permissions.get_by_ids(&desired).await?;
        let known: HashSet<Uuid> = desired_permissions.iter().map(|p| p.id).collect();
        if let Some(unknown) = desired.iter().find(|id| !known.contains(*id)) {
            return Err(ShopdeskError::validation(format!(
                "Permission {unknown} does not exist"
            )));
        }

        let current: Vec<Uuid> = self
            .permissions
            .get_role_grants(role_id)
            .await?
            .into_iter()
            .map(|g| g.permission_id)
            .collect();

        let (to_add, to_remove) = diff_ids(&current, &desired);
        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(format!("Permissions of role {} unchanged", role.name));
        }

        let removed = self.permissions.get_by_ids(&to_remove).await?;
        let added: Vec<&Permission> = desired_permissions
            .iter()
            .filter(|p| to_add.contains(&p.id))
            .collect();

        self.permissions
            .apply_role_permission_diff(role_id, &to_add, &to_remove, Grantor::User(principal.id))
            .await?;

        let added_names: Vec<&str> = added.iter().map(|p| p.name.as_str()).collect();
        let removed_names: Vec<&str> = removed.iter().map(|p| p.name.as_str()).collect();

        info!(
            %role_id,
            added = added_names.len(),
            removed = removed_names.len(),
            "Role permissions updated"
        );
        self.audit
            .log_audit(
                principal.id,
                "roles.update_permissions",
                format!("Updated permissions of role {}", role.name),
                Some(json!({
                    "role_id": role_id,
                    "added": added_names,
                    "removed": removed_names,
                })),
            )
            .await;
        self.invalidator
            .invalidate(Invalidation::RolePermissions { role_id })
            .await;

        Ok(format!("Permissions of role {} updated", role.name))
    }

    /// Replace the user's role assignments with `desired`.
    pub async fn update_user_roles(
        &self,
        session: Option<&Session>,
        user_id: Uuid,
        desired: &[Uuid],
    ) -> ActionResult {
        ActionResult::from_outcome(
            "users.update_roles",
            self.try_update_user_roles(session, user_id, desired).await,
        )
    }

    async fn try_update_user_roles(
        &self,
        session: Option<&Session>,
        user_id: Uuid,
        desired: &[Uuid],
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "users.update", None)
            .await?;

        let user = self.gate.users().get_by_id(user_id).await?;
        let desired = dedup_ids(desired);

        let mut desired_roles = Vec::with_capacity(desired.len());
        for role_id in &desired {
            match self.roles.get_by_id(*role_id).await {
                Ok(role) => desired_roles.push(role),
                Err(ShopdeskError::NotFound { .. }) => {
                    return Err(ShopdeskError::validation(format!(
                        "Role {role_id} does not exist"
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        let current_roles = self.roles.get_user_roles(user_id).await?;
        let current: Vec<Uuid> = current_roles.iter().map(|r| r.id).collect();

        let (to_add, to_remove) = diff_ids(&current, &desired);
        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(format!("Roles of {} unchanged", user.full_name));
        }

        self.roles
            .apply_user_role_diff(user_id, &to_add, &to_remove)
            .await?;

        let added: Vec<&str> = desired_roles
            .iter()
            .filter(|r| to_add.contains(&r.id))
            .map(|r| r.name.as_str())
            .collect();
        let removed: Vec<&str> = current_roles
            .iter()
            .filter(|r| to_remove.contains(&r.id))
            .map(|r| r.name.as_str())
            .collect();

        self.audit
            .log_audit(
                principal.id,
                "users.update_roles",
                format!("Updated roles of {}", user.full_name),
                Some(json!({
                    "user_id": user_id,
                    "added": added,
                    "removed": removed,
                })),
            )
            .await;
        self.invalidator
            .invalidate(Invalidation::UserRoles { user_id })
            .await;

        Ok(format!("Roles of {} updated", user.full_name))
    }

    /// Remove a permission from the catalog together with every grant of
    /// it. Menu items gated by it become dangling and stay hidden.
    pub async fn delete_permission(
        &self,
        session: Option<&Session>,
        permission_id: Uuid,
    ) -> ActionResult {
        ActionResult::from_outcome(
            "permissions.delete",
            self.try_delete_permission(session, permission_id).await,
        )
    }

    async fn try_delete_permission(
        &self,
        session: Option<&Session>,
        permission_id: Uuid,
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "roles.delete", None)
            .await?;

        let permission = self.permissions.get_by_id(permission_id).await?;
        self.permissions.delete(permission_id).await?;

        info!(%permission_id, name = %permission.name, "Permission deleted");
        self.audit
            .log_audit(
                principal.id,
                "permissions.delete",
                format!("Deleted permission {}", permission.name),
                Some(json!({
                    "permission_id": permission_id,
                    "name": permission.name,
                })),
            )
            .await;
        self.invalidator
            .invalidate(Invalidation::PermissionDeleted { permission_id })
            .await;

        Ok(format!("Permission {} deleted", permission.name))
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    pub async fn list_roles(
        &self,
        session: Option<&Session>,
        pagination: Pagination,
    ) -> ShopdeskResult<PaginatedResult<Role>> {
        self.gate
            .require_permission(session, "roles.view", None)
            .await?;
        self.roles.list(pagination).await
    }

    pub async fn get_role(
        &self,
        session: Option<&Session>,
        role_id: Uuid,
    ) -> ShopdeskResult<RoleDetail> {
        self.gate
            .require_permission(session, "roles.view", None)
            .await?;

        let role = self.roles.get_by_id(role_id).await?;
        let permissions = self.permissions.get_role_permissions(role_id).await?;
        let user_count = self.roles.count_users(role_id).await?;

        Ok(RoleDetail {
            role,
            permissions,
            user_count,
        })
    }

    /// The permission catalog grouped by the resource segment of each
    /// permission name (`products` for `products.view`).
    pub async fn list_permissions(
        &self,
        session: Option<&Session>,
    ) -> ShopdeskResult<BTreeMap<String, Vec<Permission>>> {
        self.gate
            .require_permission(session, "roles.view", None)
            .await?;

        let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
        for permission in self.permissions.list().await? {
            let resource = permission
                .name
                .split_once('.')
                .map(|(resource, _)| resource.to_string())
                .unwrap_or_else(|| permission.name.clone());
            grouped.entry(resource).or_default().push(permission);
        }
        Ok(grouped)
    }
}

fn role_name_conflict(name: &str) -> ShopdeskError {
    ShopdeskError::Conflict {
        entity: "role".into(),
        message: format!("A role named {} already exists", name.trim()),
    }
}
