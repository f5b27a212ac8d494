//! Menu item domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored navigation entry. Items form a tree through `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItem {
    pub id: Uuid,
    pub label: String,
    pub icon: String,
    pub href: String,
    pub order: i32,
    pub parent_id: Option<Uuid>,
    pub show_in_menu: bool,
    /// `None` means the item is public.
    pub permission_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMenuItem {
    pub label: String,
    pub icon: String,
    pub href: String,
    pub order: i32,
    pub parent_id: Option<Uuid>,
    pub show_in_menu: bool,
    pub permission_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateMenuItem {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub href: Option<String>,
    pub order: Option<i32>,
    /// `Some(Some(id))` = re-parent, `Some(None)` = make root, `None` = no change.
    pub parent_id: Option<Option<Uuid>>,
    pub show_in_menu: Option<bool>,
    /// `Some(Some(id))` = gate, `Some(None)` = make public, `None` = no change.
    pub permission_id: Option<Option<Uuid>>,
}

/// A menu item joined with the name of its gating permission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuEntry {
    pub item: MenuItem,
    pub gate: MenuGate,
}

/// How a menu item is gated once its permission link has been resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MenuGate {
    Public,
    Permission(String),
    /// The linked permission no longer exists. Never visible.
    Dangling,
}

/// A resolved node handed to the UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuNode {
    pub id: Uuid,
    pub label: String,
    pub icon: String,
    pub href: String,
    pub order: i32,
    pub children: Vec<MenuNode>,
}
