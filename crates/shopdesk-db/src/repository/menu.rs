//! SurrealDB implementation of [`MenuRepository`].
//!
//! Menu items are stored flat with an optional `parent_id` string. The
//! store does not prevent cycles; callers serialize structural writes and
//! check descendants before re-parenting.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use shopdesk_core::error::ShopdeskResult;
use shopdesk_core::models::menu::{CreateMenuItem, MenuEntry, MenuGate, MenuItem, UpdateMenuItem};
use shopdesk_core::repository::MenuRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MenuItemRowWithId {
    record_id: String,
    label: String,
    icon: String,
    href: String,
    sort_order: i64,
    parent_id: Option<String>,
    show_in_menu: bool,
    permission_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl MenuItemRowWithId {
    fn try_into_item(self) -> Result<MenuItem, DbError> {
        let order = i32::try_from(self.sort_order)
            .map_err(|e| DbError::Decode(format!("sort_order out of range: {e}")))?;
        Ok(MenuItem {
            id: parse_uuid(&self.record_id, "menu_item")?,
            label: self.label,
            icon: self.icon,
            href: self.href,
            order,
            parent_id: parse_opt_uuid(self.parent_id.as_deref(), "parent")?,
            show_in_menu: self.show_in_menu,
            permission_id: parse_opt_uuid(self.permission_id.as_deref(), "permission")?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct PermissionNameRow {
    record_id: String,
    name: String,
}

/// SurrealDB implementation of the Menu repository.
#[derive(Clone)]
pub struct SurrealMenuRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMenuRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MenuRepository for SurrealMenuRepository<C> {
    async fn create(&self, input: CreateMenuItem) -> ShopdeskResult<MenuItem> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('menu_item', $id) SET \
                 label = $label, icon = $icon, href = $href, \
                 sort_order = $sort_order, parent_id = $parent_id, \
                 show_in_menu = $show_in_menu, permission_id = $permission_id \
                 RETURN meta::id(id) AS record_id, *",
            )
            .bind(("id", id_str.clone()))
            .bind(("label", input.label))
            .bind(("icon", input.icon))
            .bind(("href", input.href))
            .bind(("sort_order", i64::from(input.order)))
            .bind(("parent_id", input.parent_id.map(|p| p.to_string())))
            .bind(("show_in_menu", input.show_in_menu))
            .bind(("permission_id", input.permission_id.map(|p| p.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MenuItemRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "menu_item".into(),
            id: id_str,
        })?;

        Ok(row.try_into_item()?)
    }

    async fn get_by_id(&self, id: Uuid) -> ShopdeskResult<MenuItem> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('menu_item', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MenuItemRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "menu_item".into(),
            id: id_str,
        })?;

        Ok(row.try_into_item()?)
    }

    async fn update(&self, id: Uuid, input: UpdateMenuItem) -> ShopdeskResult<MenuItem> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.label.is_some() {
            sets.push("label = $label");
        }
        if input.icon.is_some() {
            sets.push("icon = $icon");
        }
        if input.href.is_some() {
            sets.push("href = $href");
        }
        if input.order.is_some() {
            sets.push("sort_order = $sort_order");
        }
        if input.parent_id.is_some() {
            sets.push("parent_id = $parent_id");
        }
        if input.show_in_menu.is_some() {
            sets.push("show_in_menu = $show_in_menu");
        }
        if input.permission_id.is_some() {
            sets.push("permission_id = $permission_id");
        }

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!(
            "UPDATE type::record('menu_item', $id) SET {} \
             RETURN meta::id(id) AS record_id, *",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(label) = input.label {
            builder = builder.bind(("label", label));
        }
        if let Some(icon) = input.icon {
            builder = builder.bind(("icon", icon));
        }
        if let Some(href) = input.href {
            builder = builder.bind(("href", href));
        }
        if let Some(order) = input.order {
            builder = builder.bind(("sort_order", i64::from(order)));
        }
        if let Some(parent_id) = input.parent_id {
            // Some(None) clears the parent and makes the item a root.
            builder = builder.bind(("parent_id", parent_id.map(|p| p.to_string())));
        }
        if let Some(show_in_menu) = input.show_in_menu {
            builder = builder.bind(("show_in_menu", show_in_menu));
        }
        if let Some(permission_id) = input.permission_id {
            builder = builder.bind(("permission_id", permission_id.map(|p| p.to_string())));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MenuItemRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "menu_item".into(),
            id: id_str,
        })?;

        Ok(row.try_into_item()?)
    }

    async fn delete(&self, id: Uuid) -> ShopdeskResult<()> {
        let item = self.get_by_id(id).await?;

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE menu_item SET parent_id = $new_parent WHERE parent_id = $id; \
                 DELETE type::record('menu_item', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("new_parent", item.parent_id.map(|p| p.to_string())))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_entries(&self) -> ShopdeskResult<Vec<MenuEntry>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM menu_item \
                 ORDER BY created_at ASC; \
                 SELECT meta::id(id) AS record_id, name FROM permission;",
            )
            .await
            .map_err(DbError::from)?;

        let items: Vec<MenuItemRowWithId> = result.take(0).map_err(DbError::from)?;
        let permissions: Vec<PermissionNameRow> = result.take(1).map_err(DbError::from)?;

        let names: HashMap<String, String> = permissions
            .into_iter()
            .map(|row| (row.record_id, row.name))
            .collect();

        items
            .into_iter()
            .map(|row| {
                let gate = match row.permission_id.as_deref() {
                    None => MenuGate::Public,
                    Some(pid) => names
                        .get(pid)
                        .map(|name| MenuGate::Permission(name.clone()))
                        .unwrap_or(MenuGate::Dangling),
                };
                Ok(MenuEntry {
                    item: row.try_into_item()?,
                    gate,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}
