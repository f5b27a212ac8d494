//! Integration tests for the User repository using in-memory SurrealDB.

use shopdesk_core::error::ShopdeskError;
use shopdesk_core::models::role::CreateRole;
use shopdesk_core::models::user::CreateUser;
use shopdesk_core::principal::Principal;
use shopdesk_core::repository::{PermissionRepository, RoleRepository, UserRepository};
use shopdesk_db::repository::{
    SurrealPermissionRepository, SurrealRoleRepository, SurrealUserRepository, verify_password,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    shopdesk_db::run_migrations(&db).await.unwrap();
    shopdesk_db::seed::seed_catalog(&db).await.unwrap();
    db
}

fn alice() -> CreateUser {
    CreateUser {
        full_name: "Alice Example".into(),
        email: "alice@example.com".into(),
        password: "s3cret-pass".into(),
    }
}

#[tokio::test]
async fn create_hashes_password() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo.create(alice()).await.unwrap();
    assert_ne!(user.password_hash, "s3cret-pass");
    assert!(verify_password("s3cret-pass", &user.password_hash, None).unwrap());

    let by_email = repo.get_by_email("alice@example.com").await.unwrap();
    assert_eq!(by_email.id, user.id);
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(alice()).await.unwrap();
    let err = repo.create(alice()).await.unwrap_err();
    assert!(matches!(err, ShopdeskError::Conflict { .. }));
}

#[tokio::test]
async fn get_with_roles_joins_permission_names() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db.clone());

    let user = users.create(alice()).await.unwrap();
    let cashier = roles
        .create(CreateRole {
            name: "Cashier".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    let stocker = roles
        .create(CreateRole {
            name: "Stocker".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let orders_view = permissions.get_by_name("orders.view").await.unwrap();
    let products_view = permissions.get_by_name("products.view").await.unwrap();
    let products_update = permissions.get_by_name("products.update").await.unwrap();

    let system = shopdesk_core::models::permission::Grantor::System;
    permissions
        .grant_to_role(cashier.id, orders_view.id, system)
        .await
        .unwrap();
    permissions
        .grant_to_role(cashier.id, products_view.id, system)
        .await
        .unwrap();
    permissions
        .grant_to_role(stocker.id, products_view.id, system)
        .await
        .unwrap();
    permissions
        .grant_to_role(stocker.id, products_update.id, system)
        .await
        .unwrap();

    roles.assign_to_user(user.id, cashier.id).await.unwrap();
    roles.assign_to_user(user.id, stocker.id).await.unwrap();

    let loaded = users.get_with_roles(user.id).await.unwrap();
    assert_eq!(loaded.roles.len(), 2);
    assert_eq!(loaded.roles[0].role_name, "Cashier");
    assert_eq!(
        loaded.roles[0].permissions,
        vec!["orders.view".to_string(), "products.view".to_string()]
    );

    let principal = Principal::from(loaded);
    let effective: Vec<_> = principal.effective_permissions().into_iter().collect();
    assert_eq!(
        effective,
        vec!["orders.view", "products.update", "products.view"]
    );
}

#[tokio::test]
async fn get_with_roles_for_user_without_roles() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db);
    let user = users.create(alice()).await.unwrap();

    let loaded = users.get_with_roles(user.id).await.unwrap();
    assert!(loaded.roles.is_empty());
}

#[tokio::test]
async fn get_with_roles_for_missing_user_is_not_found() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db);

    let err = users.get_with_roles(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ShopdeskError::NotFound { .. }));
}

#[tokio::test]
async fn delete_user_drops_assignments() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());

    let user = users.create(alice()).await.unwrap();
    let admin = roles
        .get_by_name(shopdesk_db::seed::ADMINISTRATOR_ROLE)
        .await
        .unwrap();
    roles.assign_to_user(user.id, admin.id).await.unwrap();
    assert_eq!(roles.count_users(admin.id).await.unwrap(), 1);

    users.delete(user.id).await.unwrap();
    assert_eq!(roles.count_users(admin.id).await.unwrap(), 0);
}
