//! SurrealDB implementation of [`PermissionRepository`].
//!
//! Role grants live in the `grants` relation table (`role -> grants ->
//! permission`). A unique `(in, out)` index keeps each pair at most once.

use chrono::{DateTime, Utc};
use shopdesk_core::error::ShopdeskResult;
use shopdesk_core::models::permission::{CreatePermission, Grantor, Permission, RolePermission};
use shopdesk_core::repository::PermissionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, record_list};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    name: String,
    description: String,
    resource_id: String,
    action_id: String,
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        Ok(Permission {
            id: parse_uuid(&self.record_id, "permission")?,
            name: self.name,
            description: self.description,
            resource_id: parse_uuid(&self.resource_id, "resource")?,
            action_id: parse_uuid(&self.action_id, "action")?,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct GrantRow {
    permission_id: String,
    granted_by: String,
    granted_at: DateTime<Utc>,
}

fn rows_into_permissions(rows: Vec<PermissionRowWithId>) -> Result<Vec<Permission>, DbError> {
    rows.into_iter()
        .map(|row| row.try_into_permission())
        .collect()
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Run a single-row lookup bound to `$value`.
    async fn fetch_one(&self, query: &str, value: String) -> ShopdeskResult<Permission> {
        let mut result = self
            .db
            .query(query)
            .bind(("value", value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: value,
        })?;

        Ok(row.try_into_permission()?)
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> ShopdeskResult<Permission> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('permission', $id) SET \
                 name = $name, description = $description, \
                 resource_id = $resource_id, action_id = $action_id",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description.clone()))
            .bind(("resource_id", input.resource_id.to_string()))
            .bind(("action_id", input.action_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(Permission {
            id,
            name: input.name,
            description: input.description,
            resource_id: input.resource_id,
            action_id: input.action_id,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> ShopdeskResult<Permission> {
        self.fetch_one(
            "SELECT meta::id(id) AS record_id, * FROM type::record('permission', $value)",
            id.to_string(),
        )
        .await
    }

    async fn get_by_name(&self, name: &str) -> ShopdeskResult<Permission> {
        self.fetch_one(
            "SELECT meta::id(id) AS record_id, * FROM permission WHERE name = $value",
            name.to_string(),
        )
        .await
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> ShopdeskResult<Vec<Permission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM permission \
             WHERE id IN {} ORDER BY name ASC",
            record_list("permission", ids)
        );

        let mut result = self.db.query(query).await.map_err(DbError::from)?;
        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_permissions(rows)?)
    }

    async fn list(&self) -> ShopdeskResult<Vec<Permission>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM permission ORDER BY name ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_permissions(rows)?)
    }

    async fn delete(&self, id: Uuid) -> ShopdeskResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE grants WHERE out = type::record('permission', $id); \
                 DELETE type::record('permission', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn grant_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        granted_by: Grantor,
    ) -> ShopdeskResult<()> {
        let query = format!(
            "RELATE role:`{role_id}` -> grants -> permission:`{permission_id}` \
             SET granted_by = $granted_by, granted_at = time::now();"
        );

        let outcome = self
            .db
            .query(query)
            .bind(("granted_by", granted_by.as_stored()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()));

        match outcome {
            Ok(_) => Ok(()),
            // Already granted: keep the original provenance.
            Err(e) if e.is_unique_violation() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn revoke_from_role(&self, role_id: Uuid, permission_id: Uuid) -> ShopdeskResult<()> {
        self.db
            .query(
                "DELETE grants WHERE \
                 in = type::record('role', $role_id) AND \
                 out = type::record('permission', $perm_id)",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("perm_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_role_permissions(&self, role_id: Uuid) -> ShopdeskResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 ) ORDER BY name ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_permissions(rows)?)
    }

    async fn get_role_grants(&self, role_id: Uuid) -> ShopdeskResult<Vec<RolePermission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(out) AS permission_id, granted_by, granted_at \
                 FROM grants WHERE in = type::record('role', $role_id) \
                 ORDER BY granted_at ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                let granted_by = Grantor::parse(&row.granted_by).ok_or_else(|| {
                    DbError::Decode(format!("invalid grantor: {}", row.granted_by))
                })?;
                Ok(RolePermission {
                    role_id,
                    permission_id: parse_uuid(&row.permission_id, "permission")?,
                    granted_by,
                    granted_at: row.granted_at,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn apply_role_permission_diff(
        &self,
        role_id: Uuid,
        to_add: &[Uuid],
        to_remove: &[Uuid],
        granted_by: Grantor,
    ) -> ShopdeskResult<()> {
        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(());
        }

        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        if !to_remove.is_empty() {
            statements.push(format!(
                "DELETE grants WHERE in = role:`{role_id}` AND out IN {};",
                record_list("permission", to_remove)
            ));
        }
        for permission_id in to_add {
            statements.push(format!(
                "RELATE role:`{role_id}` -> grants -> permission:`{permission_id}` \
                 SET granted_by = $granted_by, granted_at = time::now();"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        self.db
            .query(statements.join(" "))
            .bind(("granted_by", granted_by.as_stored()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
