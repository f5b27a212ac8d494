//! Process-wide menu cache and the invalidation fan-out that client-side
//! caches subscribe to.

use std::sync::Arc;
use std::time::Duration;

use shopdesk_core::menu_tree::MenuTree;
use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

struct CachedTree {
    tree: Arc<MenuTree>,
    stored_at: Instant,
}

/// A single slot holding the unfiltered menu tree. The slot is replaced
/// wholesale, so concurrent refreshes only race to store equal trees.
pub struct MenuCache {
    ttl: Duration,
    slot: RwLock<Option<CachedTree>>,
}

impl MenuCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// The cached tree, unless it is missing or older than the TTL.
    pub async fn get(&self) -> Option<Arc<MenuTree>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|cached| cached.stored_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.tree))
    }

    pub async fn store(&self, tree: MenuTree) -> Arc<MenuTree> {
        let tree = Arc::new(tree);
        *self.slot.write().await = Some(CachedTree {
            tree: Arc::clone(&tree),
            stored_at: Instant::now(),
        });
        debug!(items = tree.len(), "Menu cache refreshed");
        tree
    }

    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }
}

/// What changed. Subscribers decide which of their own caches to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// A menu item was created, updated or deleted.
    Menu,
    /// A role was created, renamed or deleted.
    Roles,
    /// The permission set of a role changed.
    RolePermissions { role_id: Uuid },
    /// The role assignments of a user changed.
    UserRoles { user_id: Uuid },
    /// A permission and all of its grants were removed.
    PermissionDeleted { permission_id: Uuid },
}

/// Purges the menu cache and broadcasts the event to subscribers.
#[derive(Clone)]
pub struct CacheInvalidator {
    menu: Arc<MenuCache>,
    sender: broadcast::Sender<Invalidation>,
}

impl CacheInvalidator {
    pub fn new(menu: Arc<MenuCache>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { menu, sender }
    }

    pub fn menu_cache(&self) -> &Arc<MenuCache> {
        &self.menu
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.sender.subscribe()
    }

    /// Every event drops the cached menu: role and permission changes
    /// alter gates as much as menu edits do.
    pub async fn invalidate(&self, event: Invalidation) {
        self.menu.invalidate().await;
        // No subscribers is not an error.
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(?event, receivers, "Caches invalidated");
    }
}
