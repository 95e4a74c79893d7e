//! Roles and grant sets
//!
//! A role holds per-node grants for both trees. A principal's grant set for a
//! tree is the union of the grants of every role assigned to them; holding a
//! role named `admin` implies crud on every node of both trees.

use crate::access::{PermissionGrant, PermissionLevel};
use crate::error::ApiError;
use crate::store::RoleStore;
use crate::types::{NodeId, Principal, TreeKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Role name that implies crud everywhere
pub const ADMIN_ROLE: &str = "admin";

/// Role with per-node grants on both trees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archive_categories: Vec<PermissionGrant>,
    #[serde(default)]
    pub organigram_nodes: Vec<PermissionGrant>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            archive_categories: Vec::new(),
            organigram_nodes: Vec::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.name == ADMIN_ROLE
    }

    pub fn grants(&self, kind: TreeKind) -> &[PermissionGrant] {
        match kind {
            TreeKind::Category => &self.archive_categories,
            TreeKind::Organigram => &self.organigram_nodes,
        }
    }

    fn grants_mut(&mut self, kind: TreeKind) -> &mut Vec<PermissionGrant> {
        match kind {
            TreeKind::Category => &mut self.archive_categories,
            TreeKind::Organigram => &mut self.organigram_nodes,
        }
    }

    /// Set the level granted on `node`, replacing any previous grant on it
    pub fn grant(&mut self, kind: TreeKind, node: impl Into<NodeId>, level: PermissionLevel) {
        let node = node.into();
        let grants = self.grants_mut(kind);
        grants.retain(|g| g.node != node);
        grants.push(PermissionGrant::new(node, level));
    }

    /// Remove every grant on `node`; returns whether anything was removed
    pub fn revoke(&mut self, kind: TreeKind, node: &str) -> bool {
        let grants = self.grants_mut(kind);
        let before = grants.len();
        grants.retain(|g| g.node != node);
        grants.len() != before
    }

    /// Copy the grants held on `parent` onto a newly created `child`
    ///
    /// Returns whether the role changed.
    pub fn inherit_grants(&mut self, kind: TreeKind, parent: &str, child: &str) -> bool {
        let inherited: Vec<PermissionLevel> = self
            .grants(kind)
            .iter()
            .filter(|g| g.node == parent)
            .map(|g| g.level)
            .collect();
        let mut changed = false;
        for level in inherited {
            let exists = self
                .grants(kind)
                .iter()
                .any(|g| g.node == child && g.level == level);
            if !exists {
                self.grants_mut(kind).push(PermissionGrant::new(child, level));
                changed = true;
            }
        }
        changed
    }

    /// Drop grants on nodes that no longer exist
    pub fn prune_grants(&mut self, kind: TreeKind, removed: &[NodeId]) -> bool {
        let grants = self.grants_mut(kind);
        let before = grants.len();
        grants.retain(|g| !removed.contains(&g.node));
        grants.len() != before
    }
}

/// Grants of one principal on one tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSet {
    pub is_admin: bool,
    pub grants: Vec<PermissionGrant>,
}

impl GrantSet {
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            grants: Vec::new(),
        }
    }

    /// No role at all; sees nothing in filtered trees
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_grants(grants: Vec<PermissionGrant>) -> Self {
        Self {
            is_admin: false,
            grants,
        }
    }

    /// Union of the grants of `roles` on `kind`
    pub fn from_roles<'a>(roles: impl IntoIterator<Item = &'a Role>, kind: TreeKind) -> Self {
        let mut set = GrantSet::default();
        for role in roles {
            set.is_admin |= role.is_admin();
            set.grants.extend(role.grants(kind).iter().cloned());
        }
        set
    }
}

/// Supplies the grant set of a principal, as the session layer would
pub trait GrantSupplier: Send + Sync {
    fn grants_for(&self, principal: &str, kind: TreeKind) -> Result<GrantSet, ApiError>;
}

/// Grant supplier backed by a role store
pub struct RoleDirectory {
    store: Arc<dyn RoleStore>,
}

impl RoleDirectory {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// Roles assigned to `principal`; assignments to deleted roles are skipped
    pub fn roles_of(&self, principal: &str) -> Result<Vec<Role>, ApiError> {
        let mut roles = Vec::new();
        for name in self.store.assignments(principal)? {
            match self.store.get_role(&name)? {
                Some(role) => roles.push(role),
                None => tracing::warn!(principal, role = %name, "Assigned role not found"),
            }
        }
        Ok(roles)
    }

    /// Give every role holding grants on `parent` the same grants on `child`
    pub fn propagate_to_child(
        &self,
        kind: TreeKind,
        parent: &str,
        child: &str,
    ) -> Result<usize, ApiError> {
        let mut updated = 0;
        for mut role in self.store.list_roles()? {
            if role.inherit_grants(kind, parent, child) {
                self.store.put_role(&role)?;
                updated += 1;
            }
        }
        if updated > 0 {
            tracing::info!(tree = %kind, parent, child, roles = updated, "Propagated grants to new node");
        }
        Ok(updated)
    }

    /// Remove grants that point at deleted nodes
    pub fn prune(&self, kind: TreeKind, removed: &[NodeId]) -> Result<usize, ApiError> {
        let mut updated = 0;
        for mut role in self.store.list_roles()? {
            if role.prune_grants(kind, removed) {
                self.store.put_role(&role)?;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

impl GrantSupplier for RoleDirectory {
    fn grants_for(&self, principal: &str, kind: TreeKind) -> Result<GrantSet, ApiError> {
        let roles = self.roles_of(principal)?;
        Ok(GrantSet::from_roles(roles.iter(), kind))
    }
}

/// Principal with their assigned role names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub principal: Principal,
    pub roles: Vec<String>,
}
