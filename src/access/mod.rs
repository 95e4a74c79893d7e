//! Access control over the two trees
//!
//! Role-granted permission levels, the effective permission lattice, and the
//! resolver that expands grants across a forest.

pub mod resolver;
pub mod role;

pub use resolver::resolve;
pub use role::{GrantSet, GrantSupplier, Role, RoleDirectory, ADMIN_ROLE};

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Permission level a role grants on a node; `Crud` implies `View`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    View,
    Crud,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::View => f.write_str("view"),
            PermissionLevel::Crud => f.write_str("crud"),
        }
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(PermissionLevel::View),
            "crud" => Ok(PermissionLevel::Crud),
            other => Err(format!("Unknown permission level: {} (expected view or crud)", other)),
        }
    }
}

/// Explicit grant of `level` on `node`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub node: NodeId,
    pub level: PermissionLevel,
}

impl PermissionGrant {
    pub fn new(node: impl Into<NodeId>, level: PermissionLevel) -> Self {
        Self {
            node: node.into(),
            level,
        }
    }

    pub fn view(node: impl Into<NodeId>) -> Self {
        Self::new(node, PermissionLevel::View)
    }

    pub fn crud(node: impl Into<NodeId>) -> Self {
        Self::new(node, PermissionLevel::Crud)
    }
}

/// Permission a principal actually holds on a node after inheritance
///
/// Variants are ordered by strength. `InheritedStructural` marks an ancestor
/// kept only to connect a filtered tree; it authorizes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectivePermission {
    None,
    InheritedStructural,
    View,
    Crud,
}

impl EffectivePermission {
    pub fn allows_view(&self) -> bool {
        matches!(self, EffectivePermission::View | EffectivePermission::Crud)
    }

    pub fn allows_crud(&self) -> bool {
        matches!(self, EffectivePermission::Crud)
    }
}

impl From<PermissionLevel> for EffectivePermission {
    fn from(level: PermissionLevel) -> Self {
        match level {
            PermissionLevel::View => EffectivePermission::View,
            PermissionLevel::Crud => EffectivePermission::Crud,
        }
    }
}

/// Resolved permissions of one principal over one forest
///
/// Nodes absent from the map have `EffectivePermission::None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveMap {
    admin: bool,
    entries: HashMap<NodeId, EffectivePermission>,
}

impl EffectiveMap {
    pub(crate) fn new(admin: bool, entries: HashMap<NodeId, EffectivePermission>) -> Self {
        Self { admin, entries }
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn get(&self, id: &str) -> EffectivePermission {
        self.entries
            .get(id)
            .copied()
            .unwrap_or(EffectivePermission::None)
    }

    /// Present in a filtered response (view, crud or structural)
    pub fn includes(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn can_view(&self, id: &str) -> bool {
        self.get(id).allows_view()
    }

    pub fn can_crud(&self, id: &str) -> bool {
        self.get(id).allows_crud()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &EffectivePermission)> {
        self.entries.iter()
    }
}
