//! Integration tests for the authorization gate and role administration.

use std::sync::Arc;
use std::time::Duration;

use shopdesk_authz::audit::AuditLogService;
use shopdesk_authz::config::DEFAULT_DENIAL_MESSAGE;
use shopdesk_authz::{
    AuditRecorder, AuthorizationGate, AuthzError, CacheInvalidator, Invalidation, MenuCache,
    RoleService,
};
use shopdesk_core::error::{ShopdeskError, ShopdeskResult};
use shopdesk_core::models::audit::{AuditLogEntry, CreateAuditLogEntry};
use shopdesk_core::models::permission::Grantor;
use shopdesk_core::models::role::{CreateRole, UpdateRole};
use shopdesk_core::models::user::CreateUser;
use shopdesk_core::principal::Session;
use shopdesk_core::repository::{
    AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination, PermissionRepository,
    RoleRepository, UserRepository,
};
use shopdesk_db::repository::{
    SurrealAuditLogRepository, SurrealPermissionRepository, SurrealRoleRepository,
    SurrealUserRepository,
};
use shopdesk_db::seed::{seed_admin_user, seed_catalog};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Roles<A> = RoleService<
    SurrealRoleRepository<Db>,
    SurrealPermissionRepository<Db>,
    SurrealUserRepository<Db>,
    A,
>;

/// An audit sink that always fails.
#[derive(Clone)]
struct FailingAuditRepository;

impl AuditLogRepository for FailingAuditRepository {
    async fn append(&self, _input: CreateAuditLogEntry) -> ShopdeskResult<AuditLogEntry> {
        Err(ShopdeskError::Database("audit store unavailable".into()))
    }

    async fn list(
        &self,
        _filter: AuditLogFilter,
        _pagination: Pagination,
    ) -> ShopdeskResult<PaginatedResult<AuditLogEntry>> {
        Err(ShopdeskError::Database("audit store unavailable".into()))
    }
}

struct Harness {
    db: Surreal<Db>,
    invalidator: CacheInvalidator,
    admin: Session,
    clerk: Session,
}

impl Harness {
    fn gate(&self) -> AuthorizationGate<SurrealUserRepository<Db>> {
        AuthorizationGate::new(
            SurrealUserRepository::new(self.db.clone()),
            DEFAULT_DENIAL_MESSAGE,
        )
    }

    fn service(&self) -> Roles<SurrealAuditLogRepository<Db>> {
        self.service_with_audit(SurrealAuditLogRepository::new(self.db.clone()))
    }

    fn service_with_audit<A: AuditLogRepository>(&self, audit: A) -> Roles<A> {
        RoleService::new(
            SurrealRoleRepository::new(self.db.clone()),
            SurrealPermissionRepository::new(self.db.clone()),
            self.gate(),
            AuditRecorder::new(audit),
            self.invalidator.clone(),
        )
    }

    fn roles(&self) -> SurrealRoleRepository<Db> {
        SurrealRoleRepository::new(self.db.clone())
    }

    fn permissions(&self) -> SurrealPermissionRepository<Db> {
        SurrealPermissionRepository::new(self.db.clone())
    }

    async fn audit_entries(&self, action: &str) -> Vec<AuditLogEntry> {
        SurrealAuditLogRepository::new(self.db.clone())
            .list(
                AuditLogFilter {
                    action: Some(action.into()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap()
            .items
    }

    async fn permission_id(&self, name: &str) -> Uuid {
        self.permissions().get_by_name(name).await.unwrap().id
    }
}

/// Seeded catalog, an administrator and a clerk without roles.
async fn setup() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    shopdesk_db::run_migrations(&db).await.unwrap();
    seed_catalog(&db).await.unwrap();

    let admin = seed_admin_user(&db, "Ada Admin", "admin@example.com", "change-me-now")
        .await
        .unwrap();
    let clerk = SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            full_name: "Carl Clerk".into(),
            email: "clerk@example.com".into(),
            password: "clerk-pass".into(),
        })
        .await
        .unwrap();

    let cache = Arc::new(MenuCache::new(Duration::from_secs(300)));
    Harness {
        db,
        invalidator: CacheInvalidator::new(cache, 16),
        admin: Session::new(admin.id),
        clerk: Session::new(clerk.id),
    }
}

fn cashier() -> CreateRole {
    CreateRole {
        name: "Cashier".into(),
        description: "Front desk staff".into(),
    }
}

// -----------------------------------------------------------------------
// Gate
// -----------------------------------------------------------------------

#[tokio::test]
async fn gate_rejects_missing_session() {
    let h = setup().await;
    let err = h
        .gate()
        .require_permission(None, "roles.view", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Unauthenticated { .. }));
}

#[tokio::test]
async fn gate_rejects_unknown_user() {
    let h = setup().await;
    let ghost = Session::new(Uuid::new_v4());
    let err = h
        .gate()
        .require_permission(Some(&ghost), "roles.view", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::PrincipalNotFound { .. }));
}

#[tokio::test]
async fn gate_uses_custom_message_on_forbidden() {
    let h = setup().await;
    let err = h
        .gate()
        .require_permission(Some(&h.clerk), "roles.view", Some("Ask a manager"))
        .await
        .unwrap_err();
    assert_eq!(err.message(), Some("Ask a manager"));
}

#[tokio::test]
async fn gate_returns_full_principal() {
    let h = setup().await;
    let principal = h
        .gate()
        .require_permission(Some(&h.admin), "roles.delete", None)
        .await
        .unwrap();
    assert_eq!(principal.id, h.admin.user_id);
    assert_eq!(principal.email, "admin@example.com");
    assert_eq!(principal.role_names(), vec!["Administrator"]);
}

#[tokio::test]
async fn granting_a_permission_opens_the_gate() {
    let h = setup().await;
    let service = h.service();

    let denied = service.create_role(Some(&h.clerk), cashier()).await;
    assert!(!denied.success);

    // Give the clerk a role holding roles.create.
    let creators = h
        .roles()
        .create(CreateRole {
            name: "Role creators".into(),
            description: "May create roles".into(),
        })
        .await
        .unwrap();
    let roles_create = h.permission_id("roles.create").await;
    assert!(
        service
            .update_role_permissions(Some(&h.admin), creators.id, &[roles_create])
            .await
            .success
    );
    assert!(
        service
            .update_user_roles(Some(&h.admin), h.clerk.user_id, &[creators.id])
            .await
            .success
    );

    let allowed = service.create_role(Some(&h.clerk), cashier()).await;
    assert!(allowed.success, "{}", allowed.message);
}

#[tokio::test]
async fn all_denials_share_one_opaque_message() {
    let h = setup().await;
    let service = h.service();
    let ghost = Session::new(Uuid::new_v4());

    let unauthenticated = service.create_role(None, cashier()).await;
    let missing = service.create_role(Some(&ghost), cashier()).await;
    let forbidden = service.create_role(Some(&h.clerk), cashier()).await;

    assert_eq!(unauthenticated.message, DEFAULT_DENIAL_MESSAGE);
    assert_eq!(unauthenticated, missing);
    assert_eq!(missing, forbidden);
    assert!(h.roles().get_by_name("Cashier").await.is_err());
}

// -----------------------------------------------------------------------
// Role CRUD
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_role_validates_and_audits() {
    let h = setup().await;
    let service = h.service();

    let short = service
        .create_role(
            Some(&h.admin),
            CreateRole {
                name: " a ".into(),
                description: "ok description".into(),
            },
        )
        .await;
    assert!(!short.success);
    assert!(short.message.contains("at least 2"));

    let created = service.create_role(Some(&h.admin), cashier()).await;
    assert!(created.success, "{}", created.message);

    let duplicate = service.create_role(Some(&h.admin), cashier()).await;
    assert!(!duplicate.success);
    assert!(duplicate.message.contains("already exists"));

    let entries = h.audit_entries("roles.create").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, h.admin.user_id);
    assert_eq!(entries[0].metadata["name"], "Cashier");
}

#[tokio::test]
async fn update_role_records_before_and_after() {
    let h = setup().await;
    let service = h.service();
    service.create_role(Some(&h.admin), cashier()).await;
    let role = h.roles().get_by_name("Cashier").await.unwrap();

    let result = service
        .update_role(
            Some(&h.admin),
            role.id,
            UpdateRole {
                name: Some("Head Cashier".into()),
                description: None,
            },
        )
        .await;
    assert!(result.success, "{}", result.message);

    let entries = h.audit_entries("roles.update").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].metadata["before"]["name"], "Cashier");
    assert_eq!(entries[0].metadata["after"]["name"], "Head Cashier");

    let clash = service
        .update_role(
            Some(&h.admin),
            role.id,
            UpdateRole {
                name: Some("Administrator".into()),
                description: None,
            },
        )
        .await;
    assert!(!clash.success);
    assert!(clash.message.contains("already exists"));

    let missing = service
        .update_role(Some(&h.admin), Uuid::new_v4(), UpdateRole::default())
        .await;
    assert!(!missing.success);
}

#[tokio::test]
async fn delete_role_cascades() {
    let h = setup().await;
    let service = h.service();
    service.create_role(Some(&h.admin), cashier()).await;
    let role = h.roles().get_by_name("Cashier").await.unwrap();
    let orders_view = h.permission_id("orders.view").await;

    service
        .update_role_permissions(Some(&h.admin), role.id, &[orders_view])
        .await;
    service
        .update_user_roles(Some(&h.admin), h.clerk.user_id, &[role.id])
        .await;

    let result = service.delete_role(Some(&h.admin), role.id).await;
    assert!(result.success, "{}", result.message);

    assert!(h.roles().get_user_roles(h.clerk.user_id).await.unwrap().is_empty());
    assert!(h.permissions().get_role_grants(role.id).await.unwrap().is_empty());
    let entries = h.audit_entries("roles.delete").await;
    assert_eq!(entries[0].metadata["detached_users"], 1);
}

// -----------------------------------------------------------------------
// Permission sets
// -----------------------------------------------------------------------

#[tokio::test]
async fn permission_update_is_a_diff() {
    let h = setup().await;
    let service = h.service();
    service.create_role(Some(&h.admin), cashier()).await;
    let role = h.roles().get_by_name("Cashier").await.unwrap();

    let orders_view = h.permission_id("orders.view").await;
    let orders_update = h.permission_id("orders.update").await;
    let products_view = h.permission_id("products.view").await;

    service
        .update_role_permissions(Some(&h.admin), role.id, &[orders_view, orders_update])
        .await;
    let before: Vec<_> = h.permissions().get_role_grants(role.id).await.unwrap();
    let kept = before
        .iter()
        .find(|g| g.permission_id == orders_view)
        .unwrap()
        .clone();

    let result = service
        .update_role_permissions(Some(&h.admin), role.id, &[orders_view, products_view])
        .await;
    assert!(result.success, "{}", result.message);

    let after = h.permissions().get_role_grants(role.id).await.unwrap();
    assert_eq!(after.len(), 2);
    let still_kept = after
        .iter()
        .find(|g| g.permission_id == orders_view)
        .unwrap();
    assert_eq!(still_kept.granted_at, kept.granted_at);
    assert_eq!(still_kept.granted_by, Grantor::User(h.admin.user_id));

    let entries = h.audit_entries("roles.update_permissions").await;
    assert_eq!(entries.len(), 2);
    let second = entries
        .iter()
        .find(|e| e.metadata["added"] == serde_json::json!(["products.view"]))
        .expect("audit entry for the second update");
    assert_eq!(second.metadata["removed"], serde_json::json!(["orders.update"]));
}

#[tokio::test]
async fn identical_permission_set_writes_nothing() {
    let h = setup().await;
    let service = h.service();
    service.create_role(Some(&h.admin), cashier()).await;
    let role = h.roles().get_by_name("Cashier").await.unwrap();
    let orders_view = h.permission_id("orders.view").await;

    service
        .update_role_permissions(Some(&h.admin), role.id, &[orders_view])
        .await;
    let again = service
        .update_role_permissions(Some(&h.admin), role.id, &[orders_view, orders_view])
        .await;
    assert!(again.success);

    assert_eq!(h.permissions().get_role_grants(role.id).await.unwrap().len(), 1);
    assert_eq!(h.audit_entries("roles.update_permissions").await.len(), 1);
}

#[tokio::test]
async fn unknown_permission_is_rejected() {
    let h = setup().await;
    let service = h.service();
    service.create_role(Some(&h.admin), cashier()).await;
    let role = h.roles().get_by_name("Cashier").await.unwrap();

    let result = service
        .update_role_permissions(Some(&h.admin), role.id, &[Uuid::new_v4()])
        .await;
    assert!(!result.success);
    assert!(h.permissions().get_role_grants(role.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_role_ids_are_assigned_and_audited_once() {
    let h = setup().await;
    let service = h.service();
    service.create_role(Some(&h.admin), cashier()).await;
    let role = h.roles().get_by_name("Cashier").await.unwrap();

    let result = service
        .update_user_roles(Some(&h.admin), h.clerk.user_id, &[role.id, role.id])
        .await;
    assert!(result.success, "{}", result.message);

    assert_eq!(h.roles().get_user_roles(h.clerk.user_id).await.unwrap().len(), 1);
    let entries = h.audit_entries("users.update_roles").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].metadata["added"], serde_json::json!(["Cashier"]));
}

#[tokio::test]
async fn deleting_a_permission_drops_grants_and_invalidates() {
    let h = setup().await;
    let mut rx = h.invalidator.subscribe();
    let service = h.service();
    let orders_view = h.permission_id("orders.view").await;

    let denied = service.delete_permission(Some(&h.clerk), orders_view).await;
    assert!(!denied.success);
    assert_eq!(denied.message, DEFAULT_DENIAL_MESSAGE);

    let result = service.delete_permission(Some(&h.admin), orders_view).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(
        rx.recv().await.unwrap(),
        Invalidation::PermissionDeleted {
            permission_id: orders_view
        }
    );

    assert!(h.permissions().get_by_name("orders.view").await.is_err());
    let admin_role = h.roles().get_by_name("Administrator").await.unwrap();
    let grants = h.permissions().get_role_grants(admin_role.id).await.unwrap();
    assert!(grants.iter().all(|g| g.permission_id != orders_view));
    assert_eq!(h.audit_entries("permissions.delete").await.len(), 1);

    let missing = service.delete_permission(Some(&h.admin), orders_view).await;
    assert!(!missing.success);
}

// -----------------------------------------------------------------------
// Audit, caches and reads
// -----------------------------------------------------------------------

#[tokio::test]
async fn failing_audit_does_not_block_mutation() {
    let h = setup().await;
    let service = h.service_with_audit(FailingAuditRepository);

    let result = service.create_role(Some(&h.admin), cashier()).await;
    assert!(result.success, "{}", result.message);
    assert!(h.roles().get_by_name("Cashier").await.is_ok());
}

#[tokio::test]
async fn mutations_broadcast_invalidations() {
    let h = setup().await;
    let mut rx = h.invalidator.subscribe();
    let service = h.service();

    service.create_role(Some(&h.admin), cashier()).await;
    assert_eq!(rx.recv().await.unwrap(), Invalidation::Roles);

    let role = h.roles().get_by_name("Cashier").await.unwrap();
    service
        .update_user_roles(Some(&h.admin), h.clerk.user_id, &[role.id])
        .await;
    assert_eq!(
        rx.recv().await.unwrap(),
        Invalidation::UserRoles {
            user_id: h.clerk.user_id
        }
    );
}

#[tokio::test]
async fn reads_require_roles_view() {
    let h = setup().await;
    let service = h.service();

    let err = service
        .list_roles(Some(&h.clerk), Pagination::default())
        .await
        .unwrap_err();
    assert!(err.is_auth_denial());

    let page = service
        .list_roles(Some(&h.admin), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let admin_role = &page.items[0];
    let detail = service.get_role(Some(&h.admin), admin_role.id).await.unwrap();
    assert_eq!(detail.user_count, 1);
    assert_eq!(detail.permissions.len(), 32);

    let grouped = service.list_permissions(Some(&h.admin)).await.unwrap();
    assert_eq!(grouped.len(), 8);
    assert_eq!(grouped["orders"].len(), 4);
}

#[tokio::test]
async fn audit_log_listing_is_gated() {
    let h = setup().await;
    h.service().create_role(Some(&h.admin), cashier()).await;

    let logs = AuditLogService::new(h.gate(), SurrealAuditLogRepository::new(h.db.clone()));

    assert!(
        logs.list_audit_logs(Some(&h.clerk), AuditLogFilter::default(), Pagination::default())
            .await
            .is_err()
    );
    let page = logs
        .list_audit_logs(Some(&h.admin), AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}
