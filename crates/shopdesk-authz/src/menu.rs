//! Menu resolution for principals and gated menu administration.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use shopdesk_core::error::{ShopdeskError, ShopdeskResult};
use shopdesk_core::menu_tree::MenuTree;
use shopdesk_core::models::menu::{CreateMenuItem, MenuNode, UpdateMenuItem};
use shopdesk_core::principal::{Principal, Session};
use shopdesk_core::repository::{
    AuditLogRepository, MenuRepository, PermissionRepository, UserRepository,
};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::audit::AuditRecorder;
use crate::cache::{CacheInvalidator, Invalidation, MenuCache};
use crate::gate::AuthorizationGate;
use crate::result::ActionResult;

fn validate_label_and_href(label: Option<&str>, href: Option<&str>) -> ShopdeskResult<()> {
    if label.is_some_and(|l| l.trim().is_empty()) {
        return Err(ShopdeskError::validation("Label must not be empty"));
    }
    if href.is_some_and(|h| h.trim().is_empty()) {
        return Err(ShopdeskError::validation("Link must not be empty"));
    }
    Ok(())
}

/// Menu service.
///
/// Generic over repository implementations so that this layer has no
/// dependency on the database crate.
///
/// Structural writes (create, update, delete) run one at a time: the
/// parent checks and the write they guard happen under the same lock, so
/// two crossing moves cannot both pass the cycle check.
pub struct MenuService<M, P, U, A>
where
    M: MenuRepository,
    P: PermissionRepository,
    U: UserRepository,
    A: AuditLogRepository,
{
    menu: M,
    permissions: P,
    gate: AuthorizationGate<U>,
    audit: AuditRecorder<A>,
    invalidator: CacheInvalidator,
    fetch_timeout: Duration,
    writes: Mutex<()>,
}

impl<M, P, U, A> MenuService<M, P, U, A>
where
    M: MenuRepository,
    P: PermissionRepository,
    U: UserRepository,
    A: AuditLogRepository,
{
    pub fn new(
        menu: M,
        permissions: P,
        gate: AuthorizationGate<U>,
        audit: AuditRecorder<A>,
        invalidator: CacheInvalidator,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            menu,
            permissions,
            gate,
            audit,
            invalidator,
            fetch_timeout,
            writes: Mutex::new(()),
        }
    }

    fn cache(&self) -> &Arc<MenuCache> {
        self.invalidator.menu_cache()
    }

    /// Read the stored menu, bounded by the fetch timeout.
    async fn fetch_tree(&self) -> ShopdeskResult<MenuTree> {
        match tokio::time::timeout(self.fetch_timeout, self.menu.list_entries()).await {
            Ok(entries) => Ok(MenuTree::from_entries(entries?)),
            Err(_) => Err(ShopdeskError::Internal(format!(
                "menu fetch timed out after {:?}",
                self.fetch_timeout
            ))),
        }
    }

    /// The cached tree, refreshed from storage on a miss.
    async fn tree(&self) -> ShopdeskResult<Arc<MenuTree>> {
        if let Some(tree) = self.cache().get().await {
            return Ok(tree);
        }
        let tree = self.fetch_tree().await?;
        Ok(self.cache().store(tree).await)
    }

    /// The menu a principal may see. Storage errors and timeouts degrade
    /// to an empty menu.
    pub async fn resolve_menu_for_principal(&self, principal: &Principal) -> Vec<MenuNode> {
        match self.tree().await {
            Ok(tree) => tree.resolve_for(&principal.effective_permissions()),
            Err(e) => {
                warn!(user_id = %principal.id, error = %e, "Menu unavailable, serving empty menu");
                Vec::new()
            }
        }
    }

    /// Resolve the session's principal first, then its menu. Any denial
    /// yields an empty menu.
    pub async fn resolve_menu_for_session(&self, session: Option<&Session>) -> Vec<MenuNode> {
        match self.gate.principal(session).await {
            Ok(principal) => self.resolve_menu_for_principal(&principal).await,
            Err(e) => {
                warn!(error = %e, "No principal for menu request");
                Vec::new()
            }
        }
    }

    pub async fn invalidate_menu_cache(&self) {
        self.invalidator.invalidate(Invalidation::Menu).await;
    }

    /// The unfiltered tree for the menu editor.
    pub async fn admin_menu_tree(&self, session: Option<&Session>) -> ShopdeskResult<Vec<MenuNode>> {
        self.gate
            .require_permission(session, "menu.view", None)
            .await?;
        Ok(self.tree().await?.full_tree())
    }

    async fn ensure_parent_exists(&self, parent_id: Uuid) -> ShopdeskResult<()> {
        match self.menu.get_by_id(parent_id).await {
            Ok(_) => Ok(()),
            Err(ShopdeskError::NotFound { .. }) => Err(ShopdeskError::validation(
                "Parent menu item does not exist",
            )),
            Err(e) => Err(e),
        }
    }

    async fn ensure_permission_exists(&self, permission_id: Uuid) -> ShopdeskResult<()> {
        match self.permissions.get_by_id(permission_id).await {
            Ok(_) => Ok(()),
            Err(ShopdeskError::NotFound { .. }) => {
                Err(ShopdeskError::validation("Permission does not exist"))
            }
            Err(e) => Err(e),
        }
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    pub async fn create_menu_item(
        &self,
        session: Option<&Session>,
        input: CreateMenuItem,
    ) -> ActionResult {
        ActionResult::from_outcome("menu.create", self.try_create_menu_item(session, input).await)
    }

    async fn try_create_menu_item(
        &self,
        session: Option<&Session>,
        input: CreateMenuItem,
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "menu.create", None)
            .await?;

        validate_label_and_href(Some(&input.label), Some(&input.href))?;

        let guard = self.writes.lock().await;
        if let Some(parent_id) = input.parent_id {
            self.ensure_parent_exists(parent_id).await?;
        }
        if let Some(permission_id) = input.permission_id {
            self.ensure_permission_exists(permission_id).await?;
        }

        let item = self.menu.create(input).await?;
        drop(guard);

        self.audit
            .log_audit(
                principal.id,
                "menu.create",
                format!("Created menu item {}", item.label),
                Some(json!({ "item": item })),
            )
            .await;
        self.invalidator.invalidate(Invalidation::Menu).await;

        Ok(format!("Menu item {} created", item.label))
    }

    pub async fn update_menu_item(
        &self,
        session: Option<&Session>,
        item_id: Uuid,
        input: UpdateMenuItem,
    ) -> ActionResult {
        ActionResult::from_outcome(
            "menu.update",
            self.try_update_menu_item(session, item_id, input).await,
        )
    }

    async fn try_update_menu_item(
        &self,
        session: Option<&Session>,
        item_id: Uuid,
        input: UpdateMenuItem,
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "menu.update", None)
            .await?;

        validate_label_and_href(input.label.as_deref(), input.href.as_deref())?;

        let guard = self.writes.lock().await;
        let before = self.menu.get_by_id(item_id).await?;

        if let Some(Some(new_parent)) = input.parent_id {
            // Always check against storage, never a possibly stale cache.
            let tree = self.fetch_tree().await?;
            if !tree.contains(new_parent) {
                return Err(ShopdeskError::validation("Parent menu item does not exist"));
            }
            if tree.is_descendant(new_parent, item_id) {
                return Err(ShopdeskError::validation(
                    "A menu item cannot be moved under itself or one of its descendants",
                ));
            }
        }
        if let Some(Some(permission_id)) = input.permission_id {
            self.ensure_permission_exists(permission_id).await?;
        }

        let after = self.menu.update(item_id, input).await?;
        drop(guard);

        self.audit
            .log_audit(
                principal.id,
                "menu.update",
                format!("Updated menu item {}", after.label),
                Some(json!({ "before": before, "after": after })),
            )
            .await;
        self.invalidator.invalidate(Invalidation::Menu).await;

        Ok(format!("Menu item {} updated", after.label))
    }

    pub async fn delete_menu_item(&self, session: Option<&Session>, item_id: Uuid) -> ActionResult {
        ActionResult::from_outcome(
            "menu.delete",
            self.try_delete_menu_item(session, item_id).await,
        )
    }

    async fn try_delete_menu_item(
        &self,
        session: Option<&Session>,
        item_id: Uuid,
    ) -> ShopdeskResult<String> {
        let principal = self
            .gate
            .require_permission(session, "menu.delete", None)
            .await?;

        let guard = self.writes.lock().await;
        let item = self.menu.get_by_id(item_id).await?;
        self.menu.delete(item_id).await?;
        drop(guard);

        self.audit
            .log_audit(
                principal.id,
                "menu.delete",
                format!("Deleted menu item {}", item.label),
                Some(json!({ "item": item })),
            )
            .await;
        self.invalidator.invalidate(Invalidation::Menu).await;

        Ok(format!("Menu item {} deleted", item.label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_label_or_href_is_rejected() {
        assert!(validate_label_and_href(Some("  "), Some("/x")).is_err());
        assert!(validate_label_and_href(Some("X"), Some("")).is_err());
        assert!(validate_label_and_href(Some("X"), Some("/x")).is_ok());
        assert!(validate_label_and_href(None, None).is_ok());
    }
}
