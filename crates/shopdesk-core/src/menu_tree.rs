//! In-memory menu tree: an arena of entries keyed by id plus a
//! parent → children index.
//!
//! The stored parent graph has no structural acyclicity constraint, so
//! [`MenuTree::is_descendant`] must be consulted before any re-parenting
//! write. Traversals also track visited ids and never loop on corrupt data.

use std::collections::{BTreeSet, HashMap, HashSet};

use uuid::Uuid;

use crate::models::menu::{MenuEntry, MenuGate, MenuNode};

#[derive(Debug, Clone, Default)]
pub struct MenuTree {
    entries: HashMap<Uuid, MenuEntry>,
    /// `None` holds the roots. Each bucket is sorted by `order`, ties in
    /// insertion order.
    children: HashMap<Option<Uuid>, Vec<Uuid>>,
}

impl MenuTree {
    /// Build the index from entries listed in insertion order.
    pub fn from_entries(entries: Vec<MenuEntry>) -> Self {
        let mut children: HashMap<Option<Uuid>, Vec<(i32, usize, Uuid)>> = HashMap::new();
        let mut by_id = HashMap::with_capacity(entries.len());

        for (seq, entry) in entries.into_iter().enumerate() {
            children.entry(entry.item.parent_id).or_default().push((
                entry.item.order,
                seq,
                entry.item.id,
            ));
            by_id.insert(entry.item.id, entry);
        }

        let children = children
            .into_iter()
            .map(|(parent, mut ids)| {
                ids.sort_by_key(|(order, seq, _)| (*order, *seq));
                (parent, ids.into_iter().map(|(_, _, id)| id).collect())
            })
            .collect();

        Self {
            entries: by_id,
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&MenuEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.contains_key(&id)
    }

    /// Direct children of `parent` (`None` for roots), sorted.
    pub fn children_of(&self, parent: Option<Uuid>) -> &[Uuid] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True iff `candidate_parent` is `item` itself or is reachable by
    /// following children from `item`.
    pub fn is_descendant(&self, candidate_parent: Uuid, item: Uuid) -> bool {
        if candidate_parent == item {
            return true;
        }

        let mut visited = HashSet::new();
        let mut stack = vec![item];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for &child in self.children_of(Some(current)) {
                if child == candidate_parent {
                    return true;
                }
                stack.push(child);
            }
        }
        false
    }

    /// The tree visible to a caller holding `permissions`.
    ///
    /// A node is kept iff it is shown in the menu and its gate passes.
    /// Whether it has visible children does not matter.
    pub fn resolve_for(&self, permissions: &BTreeSet<String>) -> Vec<MenuNode> {
        self.resolve(|entry| entry.item.show_in_menu && gate_allows(&entry.gate, permissions))
    }

    /// Every stored item, hidden and gated ones included.
    pub fn full_tree(&self) -> Vec<MenuNode> {
        self.resolve(|_| true)
    }

    pub fn resolve<F>(&self, visible: F) -> Vec<MenuNode>
    where
        F: Fn(&MenuEntry) -> bool,
    {
        let mut visited = HashSet::new();
        self.build(None, &visible, &mut visited)
    }

    fn build<F>(&self, parent: Option<Uuid>, visible: &F, visited: &mut HashSet<Uuid>) -> Vec<MenuNode>
    where
        F: Fn(&MenuEntry) -> bool,
    {
        let mut nodes = Vec::new();
        for id in self.children_of(parent) {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            if !visible(entry) || !visited.insert(*id) {
                continue;
            }
            let children = self.build(Some(*id), visible, visited);
            let item = &entry.item;
            nodes.push(MenuNode {
                id: item.id,
                label: item.label.clone(),
                icon: item.icon.clone(),
                href: item.href.clone(),
                order: item.order,
                children,
            });
        }
        nodes
    }
}

/// Dangling permission links fail closed.
pub fn gate_allows(gate: &MenuGate, permissions: &BTreeSet<String>) -> bool {
    match gate {
        MenuGate::Public => true,
        MenuGate::Permission(name) => permissions.contains(name),
        MenuGate::Dangling => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::menu::MenuItem;

    fn entry(label: &str, order: i32, parent: Option<Uuid>, gate: MenuGate) -> MenuEntry {
        MenuEntry {
            item: MenuItem {
                id: Uuid::new_v4(),
                label: label.into(),
                icon: "circle".into(),
                href: format!("/admin/{}", label.to_lowercase()),
                order,
                parent_id: parent,
                show_in_menu: true,
                permission_id: match gate {
                    MenuGate::Public => None,
                    _ => Some(Uuid::new_v4()),
                },
                created_at: Utc::now(),
            },
            gate,
        }
    }

    fn perms(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn labels(nodes: &[MenuNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.label.as_str()).collect()
    }

    #[test]
    fn visible_parent_keeps_empty_children() {
        let settings = entry(
            "Settings",
            0,
            None,
            MenuGate::Permission("settings.view".into()),
        );
        let webhooks = entry(
            "Webhooks",
            0,
            Some(settings.item.id),
            MenuGate::Permission("webhooks.view".into()),
        );
        let tree = MenuTree::from_entries(vec![settings, webhooks]);

        let nodes = tree.resolve_for(&perms(&["settings.view"]));
        assert_eq!(labels(&nodes), vec!["Settings"]);
        assert!(nodes[0].children.is_empty());
    }

    #[test]
    fn hidden_parent_hides_whole_branch() {
        let users = entry("Users", 0, None, MenuGate::Permission("users.view".into()));
        let list = entry("List", 0, Some(users.item.id), MenuGate::Public);
        let tree = MenuTree::from_entries(vec![users, list]);

        assert!(tree.resolve_for(&perms(&[])).is_empty());
    }

    #[test]
    fn show_in_menu_false_is_excluded() {
        let mut hidden = entry("Hidden", 0, None, MenuGate::Public);
        hidden.item.show_in_menu = false;
        let shown = entry("Shown", 1, None, MenuGate::Public);
        let tree = MenuTree::from_entries(vec![hidden, shown]);

        assert_eq!(labels(&tree.resolve_for(&perms(&[]))), vec!["Shown"]);
        assert_eq!(tree.full_tree().len(), 2);
    }

    #[test]
    fn dangling_permission_fails_closed() {
        let orphan = entry("Reports", 0, None, MenuGate::Dangling);
        let tree = MenuTree::from_entries(vec![orphan]);
        assert!(tree.resolve_for(&perms(&["reports.view"])).is_empty());
    }

    #[test]
    fn siblings_sorted_by_order_then_insertion() {
        let c = entry("C", 2, None, MenuGate::Public);
        let a = entry("A", 1, None, MenuGate::Public);
        let b = entry("B", 1, None, MenuGate::Public);
        let tree = MenuTree::from_entries(vec![c, a, b]);

        assert_eq!(labels(&tree.resolve_for(&perms(&[]))), vec!["A", "B", "C"]);
    }

    #[test]
    fn is_descendant_follows_children() {
        let a = entry("A", 0, None, MenuGate::Public);
        let b = entry("B", 0, Some(a.item.id), MenuGate::Public);
        let c = entry("C", 0, Some(b.item.id), MenuGate::Public);
        let (a_id, b_id, c_id) = (a.item.id, b.item.id, c.item.id);
        let other = entry("Other", 1, None, MenuGate::Public);
        let other_id = other.item.id;
        let tree = MenuTree::from_entries(vec![a, b, c, other]);

        assert!(tree.is_descendant(a_id, a_id));
        assert!(tree.is_descendant(c_id, a_id));
        assert!(tree.is_descendant(b_id, a_id));
        assert!(!tree.is_descendant(a_id, c_id));
        assert!(!tree.is_descendant(other_id, a_id));
    }

    #[test]
    fn corrupt_cycle_does_not_loop() {
        let mut a = entry("A", 0, None, MenuGate::Public);
        let b = entry("B", 0, Some(a.item.id), MenuGate::Public);
        // A and B point at each other; neither is a root.
        a.item.parent_id = Some(b.item.id);
        let (a_id, b_id) = (a.item.id, b.item.id);
        let tree = MenuTree::from_entries(vec![a, b]);

        assert!(tree.resolve_for(&perms(&[])).is_empty());
        assert!(tree.is_descendant(b_id, a_id));
        assert!(tree.is_descendant(a_id, b_id));
    }
}
