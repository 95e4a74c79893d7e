//! Tree and role stores
//!
//! The access engine reads a whole forest with one bulk listing per request and
//! writes back single records. Cascading deletes receive the explicit id list
//! computed from the forest.

pub mod memory;
pub mod persistence;

pub use memory::MemoryTreeStore;
pub use persistence::SledTreeStore;

use crate::access::role::{Assignment, Role};
use crate::error::{ApiError, StorageError};
use crate::tree::{Forest, TreeNode};
use crate::types::{NodeId, TreeKind};

/// Node storage for both trees
pub trait TreeStore: Send + Sync {
    fn list_all_nodes(&self, kind: TreeKind) -> Result<Vec<TreeNode>, StorageError>;

    fn get_node(&self, kind: TreeKind, id: &str) -> Result<Option<TreeNode>, StorageError>;

    /// Create or replace a node record
    fn put_node(&self, kind: TreeKind, node: &TreeNode) -> Result<(), StorageError>;

    /// Write several records as one unit
    ///
    /// Stores that can commit atomically override this; the default writes
    /// the records one after another.
    fn put_nodes(&self, kind: TreeKind, nodes: &[TreeNode]) -> Result<(), StorageError> {
        for node in nodes {
            self.put_node(kind, node)?;
        }
        Ok(())
    }

    /// Remove the given nodes; returns how many existed
    fn delete_subtree(&self, kind: TreeKind, ids: &[NodeId]) -> Result<usize, StorageError>;

    fn get_children(&self, kind: TreeKind, id: &str) -> Result<Vec<TreeNode>, StorageError> {
        Ok(self
            .list_all_nodes(kind)?
            .into_iter()
            .filter(|n| n.parent.as_deref() == Some(id))
            .collect())
    }

    /// Re-parent `id`, optionally setting its order key; false when absent
    fn apply_move(
        &self,
        kind: TreeKind,
        id: &str,
        new_parent: Option<&str>,
        order: Option<f64>,
    ) -> Result<bool, StorageError> {
        let Some(mut node) = self.get_node(kind, id)? else {
            return Ok(false);
        };
        node.parent = new_parent.map(|p| p.to_string());
        if let Some(order) = order {
            node.order = order;
        }
        self.put_node(kind, &node)?;
        Ok(true)
    }

    /// Snapshot of `kind` as an indexed forest
    fn forest(&self, kind: TreeKind) -> Result<Forest, ApiError> {
        Forest::new(kind, self.list_all_nodes(kind)?)
    }
}

/// Role and principal-assignment storage
pub trait RoleStore: Send + Sync {
    fn list_roles(&self) -> Result<Vec<Role>, StorageError>;

    fn get_role(&self, name: &str) -> Result<Option<Role>, StorageError>;

    fn put_role(&self, role: &Role) -> Result<(), StorageError>;

    fn delete_role(&self, name: &str) -> Result<bool, StorageError>;

    /// Role names assigned to `principal`; empty when unknown
    fn assignments(&self, principal: &str) -> Result<Vec<String>, StorageError>;

    fn assign(&self, assignment: &Assignment) -> Result<(), StorageError>;
}
