//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    shopdesk_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "resource",
        "action",
        "permission",
        "role",
        "user",
        "menu_item",
        "audit_log",
        "has_role",
        "grants",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    shopdesk_db::run_migrations(&db).await.unwrap();
    shopdesk_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn duplicate_role_name_is_rejected_by_index() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    shopdesk_db::run_migrations(&db).await.unwrap();

    db.query("CREATE role SET name = 'Cashier', description = ''")
        .await
        .unwrap()
        .check()
        .unwrap();

    let second = db
        .query("CREATE role SET name = 'Cashier', description = 'again'")
        .await
        .unwrap()
        .check();
    assert!(second.is_err(), "unique index on role.name should reject");
}
