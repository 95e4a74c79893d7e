//! Sled-backed persistence
//!
//! One sled tree per node kind plus one for roles and one for principal
//! assignments. Records are bincode-encoded and keyed by id/name.

use crate::access::role::{Assignment, Role};
use crate::error::StorageError;
use crate::store::{RoleStore, TreeStore};
use crate::tree::TreeNode;
use crate::types::{NodeId, TreeKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const ROLES_TREE: &str = "roles";
const ASSIGNMENTS_TREE: &str = "assignments";

fn node_tree_name(kind: TreeKind) -> &'static str {
    match kind {
        TreeKind::Category => "category_nodes",
        TreeKind::Organigram => "organigram_nodes",
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Store persisted in a sled database
pub struct SledTreeStore {
    db: sled::Db,
}

impl SledTreeStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        Ok(Self::from_db(db))
    }

    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    fn nodes(&self, kind: TreeKind) -> Result<sled::Tree, StorageError> {
        Ok(self.db.open_tree(node_tree_name(kind))?)
    }

    fn list<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>, StorageError> {
        let mut out = Vec::new();
        for entry in tree.iter() {
            let (_, value) = entry?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl TreeStore for SledTreeStore {
    fn list_all_nodes(&self, kind: TreeKind) -> Result<Vec<TreeNode>, StorageError> {
        Self::list(&self.nodes(kind)?)
    }

    fn get_node(&self, kind: TreeKind, id: &str) -> Result<Option<TreeNode>, StorageError> {
        match self.nodes(kind)?.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_node(&self, kind: TreeKind, node: &TreeNode) -> Result<(), StorageError> {
        self.nodes(kind)?.insert(node.id.as_bytes(), encode(node)?)?;
        self.flush()
    }

    fn put_nodes(&self, kind: TreeKind, nodes: &[TreeNode]) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        for node in nodes {
            batch.insert(node.id.as_bytes(), encode(node)?);
        }
        self.nodes(kind)?.apply_batch(batch)?;
        self.flush()
    }

    fn delete_subtree(&self, kind: TreeKind, ids: &[NodeId]) -> Result<usize, StorageError> {
        let tree = self.nodes(kind)?;
        let mut batch = sled::Batch::default();
        let mut existing = 0;
        for id in ids {
            if tree.contains_key(id.as_bytes())? {
                existing += 1;
                batch.remove(id.as_bytes());
            }
        }
        tree.apply_batch(batch)?;
        self.flush()?;
        Ok(existing)
    }
}

impl RoleStore for SledTreeStore {
    fn list_roles(&self) -> Result<Vec<Role>, StorageError> {
        Self::list(&self.db.open_tree(ROLES_TREE)?)
    }

    fn get_role(&self, name: &str) -> Result<Option<Role>, StorageError> {
        match self.db.open_tree(ROLES_TREE)?.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_role(&self, role: &Role) -> Result<(), StorageError> {
        self.db
            .open_tree(ROLES_TREE)?
            .insert(role.name.as_bytes(), encode(role)?)?;
        self.flush()
    }

    fn delete_role(&self, name: &str) -> Result<bool, StorageError> {
        let removed = self.db.open_tree(ROLES_TREE)?.remove(name.as_bytes())?;
        self.flush()?;
        Ok(removed.is_some())
    }

    fn assignments(&self, principal: &str) -> Result<Vec<String>, StorageError> {
        match self
            .db
            .open_tree(ASSIGNMENTS_TREE)?
            .get(principal.as_bytes())?
        {
            Some(bytes) => Ok(decode::<Assignment>(&bytes)?.roles),
            None => Ok(Vec::new()),
        }
    }

    fn assign(&self, assignment: &Assignment) -> Result<(), StorageError> {
        self.db
            .open_tree(ASSIGNMENTS_TREE)?
            .insert(assignment.principal.as_bytes(), encode(assignment)?)?;
        self.flush()
    }
}
