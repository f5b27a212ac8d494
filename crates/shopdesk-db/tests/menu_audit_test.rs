//! Integration tests for the Menu and AuditLog repositories using in-memory SurrealDB.

use serde_json::json;
use shopdesk_core::models::audit::CreateAuditLogEntry;
use shopdesk_core::models::menu::{CreateMenuItem, MenuGate, UpdateMenuItem};
use shopdesk_core::repository::{
    AuditLogFilter, AuditLogRepository, MenuRepository, Pagination, PermissionRepository,
};
use shopdesk_db::repository::{
    SurrealAuditLogRepository, SurrealMenuRepository, SurrealPermissionRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    shopdesk_db::run_migrations(&db).await.unwrap();
    db
}

fn item(label: &str, order: i32, parent_id: Option<Uuid>) -> CreateMenuItem {
    CreateMenuItem {
        label: label.into(),
        icon: "dot".into(),
        href: format!("/{}", label.to_lowercase()),
        order,
        parent_id,
        show_in_menu: true,
        permission_id: None,
    }
}

// -----------------------------------------------------------------------
// Menu
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_update_and_get_menu_item() {
    let db = setup().await;
    let menu = SurrealMenuRepository::new(db);

    let root = menu.create(item("Settings", 1, None)).await.unwrap();
    let child = menu.create(item("Webhooks", 0, Some(root.id))).await.unwrap();
    assert_eq!(child.parent_id, Some(root.id));

    let moved = menu
        .update(
            child.id,
            UpdateMenuItem {
                parent_id: Some(None),
                order: Some(7),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.parent_id, None);
    assert_eq!(moved.order, 7);
    assert_eq!(moved.label, "Webhooks");

    let fetched = menu.get_by_id(child.id).await.unwrap();
    assert_eq!(fetched, moved);
}

#[tokio::test]
async fn list_entries_resolves_gates() {
    let db = setup().await;
    db.query(
        "CREATE permission:`11111111-1111-1111-1111-111111111111` SET \
         name = 'orders.view', description = '', \
         resource_id = '00000000-0000-0000-0000-000000000001', \
         action_id = '00000000-0000-0000-0000-000000000002'",
    )
    .await
    .unwrap()
    .check()
    .unwrap();
    let orders_view = SurrealPermissionRepository::new(db.clone())
        .get_by_name("orders.view")
        .await
        .unwrap();

    let menu = SurrealMenuRepository::new(db);
    menu.create(item("Dashboard", 0, None)).await.unwrap();
    menu.create(CreateMenuItem {
        permission_id: Some(orders_view.id),
        ..item("Orders", 1, None)
    })
    .await
    .unwrap();
    menu.create(CreateMenuItem {
        permission_id: Some(Uuid::new_v4()),
        ..item("Ghost", 2, None)
    })
    .await
    .unwrap();

    let entries = menu.list_entries().await.unwrap();
    let gates: Vec<_> = entries
        .iter()
        .map(|e| (e.item.label.as_str(), e.gate.clone()))
        .collect();
    assert_eq!(
        gates,
        vec![
            ("Dashboard", MenuGate::Public),
            ("Orders", MenuGate::Permission("orders.view".into())),
            ("Ghost", MenuGate::Dangling),
        ]
    );
}

#[tokio::test]
async fn delete_lifts_children_to_grandparent() {
    let db = setup().await;
    let menu = SurrealMenuRepository::new(db);

    let root = menu.create(item("Admin", 0, None)).await.unwrap();
    let middle = menu.create(item("People", 0, Some(root.id))).await.unwrap();
    let leaf_a = menu.create(item("Users", 0, Some(middle.id))).await.unwrap();
    let leaf_b = menu.create(item("Roles", 1, Some(middle.id))).await.unwrap();

    menu.delete(middle.id).await.unwrap();

    assert_eq!(menu.get_by_id(leaf_a.id).await.unwrap().parent_id, Some(root.id));
    assert_eq!(menu.get_by_id(leaf_b.id).await.unwrap().parent_id, Some(root.id));
    assert!(menu.get_by_id(middle.id).await.is_err());
}

#[tokio::test]
async fn delete_root_makes_children_roots() {
    let db = setup().await;
    let menu = SurrealMenuRepository::new(db);

    let root = menu.create(item("Catalog", 0, None)).await.unwrap();
    let child = menu.create(item("Products", 0, Some(root.id))).await.unwrap();

    menu.delete(root.id).await.unwrap();
    assert_eq!(menu.get_by_id(child.id).await.unwrap().parent_id, None);
}

// -----------------------------------------------------------------------
// Audit log
// -----------------------------------------------------------------------

#[tokio::test]
async fn audit_append_and_filter() {
    let db = setup().await;
    let audit = SurrealAuditLogRepository::new(db);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    audit
        .append(CreateAuditLogEntry {
            user_id: alice,
            action: "roles.create".into(),
            description: "Created role Cashier".into(),
            metadata: json!({ "name": "Cashier" }),
        })
        .await
        .unwrap();
    audit
        .append(CreateAuditLogEntry {
            user_id: bob,
            action: "roles.delete".into(),
            description: "Deleted role Cashier".into(),
            metadata: serde_json::Value::Null,
        })
        .await
        .unwrap();

    let all = audit
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let alices = audit
        .list(
            AuditLogFilter {
                user_id: Some(alice),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(alices.total, 1);
    assert_eq!(alices.items[0].action, "roles.create");
    assert_eq!(alices.items[0].metadata["name"], "Cashier");

    let deletes = audit
        .list(
            AuditLogFilter {
                action: Some("roles.delete".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(deletes.items.len(), 1);
    assert!(deletes.items[0].metadata.is_object());
}
