//! Idempotent bootstrap of the permission catalog.
//!
//! Resources, actions and every `<resource>.<action>` permission are
//! declared here. The `Administrator` role receives all of them with
//! `granted_by = system`. A default menu tree is only written when the
//! menu is empty so operator edits survive restarts.

use shopdesk_core::error::{ShopdeskError, ShopdeskResult};
use shopdesk_core::models::action::{Action, CreateAction};
use shopdesk_core::models::menu::CreateMenuItem;
use shopdesk_core::models::permission::{CreatePermission, Grantor, Permission, permission_name};
use shopdesk_core::models::resource::{CreateResource, Resource};
use shopdesk_core::models::role::{CreateRole, Role};
use shopdesk_core::models::user::{CreateUser, User};
use shopdesk_core::repository::{
    ActionRepository, MenuRepository, PermissionRepository, ResourceRepository, RoleRepository,
    UserRepository,
};
use surrealdb::{Connection, Surreal};
use tracing::{debug, info};
use uuid::Uuid;

use crate::repository::{
    SurrealActionRepository, SurrealMenuRepository, SurrealPermissionRepository,
    SurrealResourceRepository, SurrealRoleRepository, SurrealUserRepository,
};

/// Name of the role that holds every seeded permission.
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// `(display name, permission key, category)`.
const RESOURCES: &[(&str, &str, &str)] = &[
    ("User", "users", "administration"),
    ("Role", "roles", "administration"),
    ("Menu", "menu", "administration"),
    ("Audit", "audit", "administration"),
    ("Settings", "settings", "administration"),
    ("Product", "products", "catalog"),
    ("Category", "categories", "catalog"),
    ("Order", "orders", "sales"),
];

const ACTIONS: &[(&str, &str)] = &[
    ("view", "Read access"),
    ("create", "Create new records"),
    ("update", "Modify existing records"),
    ("delete", "Remove records"),
];

struct SeedMenu {
    label: &'static str,
    icon: &'static str,
    href: &'static str,
    permission: Option<&'static str>,
    children: &'static [SeedMenu],
}

const DEFAULT_MENU: &[SeedMenu] = &[
    SeedMenu {
        label: "Dashboard",
        icon: "home",
        href: "/",
        permission: None,
        children: &[],
    },
    SeedMenu {
        label: "Catalog",
        icon: "package",
        href: "/catalog",
        permission: Some("products.view"),
        children: &[
            SeedMenu {
                label: "Products",
                icon: "box",
                href: "/catalog/products",
                permission: Some("products.view"),
                children: &[],
            },
            SeedMenu {
                label: "Categories",
                icon: "tags",
                href: "/catalog/categories",
                permission: Some("categories.view"),
                children: &[],
            },
        ],
    },
    SeedMenu {
        label: "Orders",
        icon: "receipt",
        href: "/orders",
        permission: Some("orders.view"),
        children: &[],
    },
    SeedMenu {
        label: "Administration",
        icon: "shield",
        href: "/admin",
        permission: None,
        children: &[
            SeedMenu {
                label: "Users",
                icon: "users",
                href: "/admin/users",
                permission: Some("users.view"),
                children: &[],
            },
            SeedMenu {
                label: "Roles",
                icon: "key",
                href: "/admin/roles",
                permission: Some("roles.view"),
                children: &[],
            },
            SeedMenu {
                label: "Menu",
                icon: "list",
                href: "/admin/menu",
                permission: Some("menu.view"),
                children: &[],
            },
            SeedMenu {
                label: "Audit log",
                icon: "history",
                href: "/admin/audit",
                permission: Some("audit.view"),
                children: &[],
            },
        ],
    },
    SeedMenu {
        label: "Settings",
        icon: "settings",
        href: "/settings",
        permission: Some("settings.view"),
        children: &[],
    },
];

/// What a seeding run created. Zeroes everywhere on a repeated run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub resources_created: usize,
    pub actions_created: usize,
    pub permissions_created: usize,
    pub administrator_created: bool,
    pub menu_items_created: usize,
}

fn is_not_found(err: &ShopdeskError) -> bool {
    matches!(err, ShopdeskError::NotFound { .. })
}

/// Seed the catalog, the `Administrator` role and the default menu.
///
/// Safe to call on every startup.
pub async fn seed_catalog<C: Connection>(db: &Surreal<C>) -> ShopdeskResult<SeedReport> {
    let resources = SurrealResourceRepository::new(db.clone());
    let actions = SurrealActionRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let menu = SurrealMenuRepository::new(db.clone());

    let mut report = SeedReport::default();

    let mut seeded_resources = Vec::with_capacity(RESOURCES.len());
    for (name, key, category) in RESOURCES {
        let resource = ensure_resource(&resources, name, category, &mut report).await?;
        seeded_resources.push((resource, *key));
    }

    let mut seeded_actions = Vec::with_capacity(ACTIONS.len());
    for (name, description) in ACTIONS {
        seeded_actions.push(ensure_action(&actions, name, description, &mut report).await?);
    }

    let mut all_permissions = Vec::new();
    for (resource, key) in &seeded_resources {
        for action in &seeded_actions {
            let permission =
                ensure_permission(&permissions, resource, key, action, &mut report).await?;
            all_permissions.push(permission);
        }
    }

    let admin = ensure_administrator(&roles, &mut report).await?;
    for permission in &all_permissions {
        permissions
            .grant_to_role(admin.id, permission.id, Grantor::System)
            .await?;
    }

    if menu.list_entries().await?.is_empty() {
        for (order, node) in DEFAULT_MENU.iter().enumerate() {
            seed_menu_node(&menu, &permissions, node, order, None, &mut report).await?;
        }
    }

    info!(
        resources = report.resources_created,
        actions = report.actions_created,
        permissions = report.permissions_created,
        administrator = report.administrator_created,
        menu_items = report.menu_items_created,
        "Catalog seeded"
    );

    Ok(report)
}

async fn ensure_resource<R: ResourceRepository>(
    repo: &R,
    name: &str,
    category: &str,
    report: &mut SeedReport,
) -> ShopdeskResult<Resource> {
    match repo.get_by_name(name).await {
        Ok(existing) => Ok(existing),
        Err(e) if is_not_found(&e) => {
            report.resources_created += 1;
            repo.create(CreateResource {
                name: name.to_string(),
                description: format!("{name} records"),
                category: Some(category.to_string()),
            })
            .await
        }
        Err(e) => Err(e),
    }
}

async fn ensure_action<A: ActionRepository>(
    repo: &A,
    name: &str,
    description: &str,
    report: &mut SeedReport,
) -> ShopdeskResult<Action> {
    match repo.get_by_name(name).await {
        Ok(existing) => Ok(existing),
        Err(e) if is_not_found(&e) => {
            report.actions_created += 1;
            repo.create(CreateAction {
                name: name.to_string(),
                description: description.to_string(),
            })
            .await
        }
        Err(e) => Err(e),
    }
}

async fn ensure_permission<P: PermissionRepository>(
    repo: &P,
    resource: &Resource,
    key: &str,
    action: &Action,
    report: &mut SeedReport,
) -> ShopdeskResult<Permission> {
    let name = permission_name(key, &action.name);
    match repo.get_by_name(&name).await {
        Ok(existing) => Ok(existing),
        Err(e) if is_not_found(&e) => {
            report.permissions_created += 1;
            repo.create(CreatePermission {
                description: format!("{} {}", action.name, resource.name),
                name,
                resource_id: resource.id,
                action_id: action.id,
            })
            .await
        }
        Err(e) => Err(e),
    }
}

async fn ensure_administrator<R: RoleRepository>(
    repo: &R,
    report: &mut SeedReport,
) -> ShopdeskResult<Role> {
    match repo.get_by_name(ADMINISTRATOR_ROLE).await {
        Ok(existing) => Ok(existing),
        Err(e) if is_not_found(&e) => {
            report.administrator_created = true;
            repo.create(CreateRole {
                name: ADMINISTRATOR_ROLE.to_string(),
                description: "Full access to the back office".to_string(),
            })
            .await
        }
        Err(e) => Err(e),
    }
}

async fn seed_menu_node<M: MenuRepository, P: PermissionRepository>(
    menu: &M,
    permissions: &P,
    node: &SeedMenu,
    order: usize,
    parent_id: Option<Uuid>,
    report: &mut SeedReport,
) -> ShopdeskResult<()> {
    let permission_id = match node.permission {
        Some(name) => Some(permissions.get_by_name(name).await?.id),
        None => None,
    };

    let item = menu
        .create(CreateMenuItem {
            label: node.label.to_string(),
            icon: node.icon.to_string(),
            href: node.href.to_string(),
            order: i32::try_from(order).unwrap_or(i32::MAX),
            parent_id,
            show_in_menu: true,
            permission_id,
        })
        .await?;
    report.menu_items_created += 1;
    debug!(label = node.label, id = %item.id, "Seeded menu item");

    for (child_order, child) in node.children.iter().enumerate() {
        Box::pin(seed_menu_node(
            menu,
            permissions,
            child,
            child_order,
            Some(item.id),
            report,
        ))
        .await?;
    }

    Ok(())
}

/// Create a user holding the `Administrator` role unless the email is
/// already taken. Returns the existing or new user.
pub async fn seed_admin_user<C: Connection>(
    db: &Surreal<C>,
    full_name: &str,
    email: &str,
    password: &str,
) -> ShopdeskResult<User> {
    let users = SurrealUserRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());

    let user = match users.get_by_email(email).await {
        Ok(existing) => existing,
        Err(e) if is_not_found(&e) => {
            info!(email, "Creating bootstrap administrator");
            users
                .create(CreateUser {
                    full_name: full_name.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await?
        }
        Err(e) => return Err(e),
    };

    let admin = roles.get_by_name(ADMINISTRATOR_ROLE).await?;
    roles.assign_to_user(user.id, admin.id).await?;

    Ok(user)
}
