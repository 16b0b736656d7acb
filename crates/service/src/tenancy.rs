//! Tenant tree and the visibility rules derived from it.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i32,
    pub name: String,
    pub active: bool,
    pub parent_id: Option<i32>,
}

impl From<models::tenant::Model> for Tenant {
    fn from(m: models::tenant::Model) -> Self {
        Self { id: m.id, name: m.name, active: m.active, parent_id: m.parent_id }
    }
}

/// Snapshot of the tenant tree taken once per request.
#[derive(Debug, Default, Clone)]
pub struct TenancyGraph {
    tenants: HashMap<i32, Tenant>,
    children: HashMap<i32, Vec<i32>>,
}

impl TenancyGraph {
    pub fn new(tenants: impl IntoIterator<Item = Tenant>) -> Self {
        let mut graph = Self::default();
        for t in tenants {
            if let Some(parent) = t.parent_id {
                graph.children.entry(parent).or_default().push(t.id);
            }
            graph.tenants.insert(t.id, t);
        }
        graph
    }

    pub fn get(&self, id: i32) -> Option<&Tenant> { self.tenants.get(&id) }

    /// True when `id` and every ancestor of it are active.
    fn chain_active(&self, id: i32) -> bool {
        let mut seen = HashSet::new();
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            if !seen.insert(cur) {
                // parent cycle in the data; treat as broken chain
                return false;
            }
            match self.tenants.get(&cur) {
                Some(t) if t.active => cursor = t.parent_id,
                _ => return false,
            }
        }
        true
    }

    /// Tenants whose records `acting` may see: itself and every descendant.
    ///
    /// Empty when `acting` is unknown, inactive, or sits under an inactive ancestor.
    /// Inactive descendants stay visible to an active parent.
    pub fn visible_tenants(&self, acting: i32) -> HashSet<i32> {
        let mut visible = HashSet::new();
        if !self.chain_active(acting) {
            return visible;
        }
        let mut queue = VecDeque::from([acting]);
        while let Some(cur) = queue.pop_front() {
            if !visible.insert(cur) {
                continue;
            }
            if let Some(kids) = self.children.get(&cur) {
                queue.extend(kids.iter().copied());
            }
        }
        visible
    }

    pub fn can_act(&self, acting: i32, target: i32) -> bool {
        self.visible_tenants(acting).contains(&target)
    }
}
