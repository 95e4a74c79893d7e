//! In-memory store for tests and embedding.

use crate::access::role::{Assignment, Role};
use crate::error::StorageError;
use crate::store::{RoleStore, TreeStore};
use crate::tree::TreeNode;
use crate::types::{NodeId, Principal, TreeKind};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Store holding everything behind parking_lot locks
#[derive(Default)]
pub struct MemoryTreeStore {
    nodes: RwLock<HashMap<TreeKind, BTreeMap<NodeId, TreeNode>>>,
    roles: RwLock<BTreeMap<String, Role>>,
    assignments: RwLock<HashMap<Principal, Vec<String>>>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `nodes` of one tree
    pub fn with_nodes(kind: TreeKind, nodes: Vec<TreeNode>) -> Self {
        let store = Self::new();
        {
            let mut map = store.nodes.write();
            let tree = map.entry(kind).or_default();
            for node in nodes {
                tree.insert(node.id.clone(), node);
            }
        }
        store
    }
}

impl TreeStore for MemoryTreeStore {
    fn list_all_nodes(&self, kind: TreeKind) -> Result<Vec<TreeNode>, StorageError> {
        Ok(self
            .nodes
            .read()
            .get(&kind)
            .map(|tree| tree.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get_node(&self, kind: TreeKind, id: &str) -> Result<Option<TreeNode>, StorageError> {
        Ok(self
            .nodes
            .read()
            .get(&kind)
            .and_then(|tree| tree.get(id).cloned()))
    }

    fn put_node(&self, kind: TreeKind, node: &TreeNode) -> Result<(), StorageError> {
        self.nodes
            .write()
            .entry(kind)
            .or_default()
            .insert(node.id.clone(), node.clone());
        Ok(())
    }

    fn put_nodes(&self, kind: TreeKind, nodes: &[TreeNode]) -> Result<(), StorageError> {
        let mut map = self.nodes.write();
        let tree = map.entry(kind).or_default();
        for node in nodes {
            tree.insert(node.id.clone(), node.clone());
        }
        Ok(())
    }

    fn delete_subtree(&self, kind: TreeKind, ids: &[NodeId]) -> Result<usize, StorageError> {
        let mut map = self.nodes.write();
        let Some(tree) = map.get_mut(&kind) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| tree.remove(*id).is_some()).count())
    }
}

impl RoleStore for MemoryTreeStore {
    fn list_roles(&self) -> Result<Vec<Role>, StorageError> {
        Ok(self.roles.read().values().cloned().collect())
    }

    fn get_role(&self, name: &str) -> Result<Option<Role>, StorageError> {
        Ok(self.roles.read().get(name).cloned())
    }

    fn put_role(&self, role: &Role) -> Result<(), StorageError> {
        self.roles.write().insert(role.name.clone(), role.clone());
        Ok(())
    }

    fn delete_role(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.roles.write().remove(name).is_some())
    }

    fn assignments(&self, principal: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .assignments
            .read()
            .get(principal)
            .cloned()
            .unwrap_or_default())
    }

    fn assign(&self, assignment: &Assignment) -> Result<(), StorageError> {
        self.assignments
            .write()
            .insert(assignment.principal.clone(), assignment.roles.clone());
        Ok(())
    }
}
