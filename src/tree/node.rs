//! Tree node records shared by archive categories and organigram nodes.

use crate::error::ApiError;
use crate::share::ShareState;
use crate::types::{NodeId, Principal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a node may hold
///
/// Categories are always `ContainerOnly`; organigram nodes pick one of the three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Holds a file, never children
    #[serde(alias = "child_document")]
    LeafWithFile,
    /// Holds a file and children
    #[serde(alias = "parent_document")]
    ContainerWithFile,
    /// Holds children only
    #[serde(alias = "parent_node")]
    ContainerOnly,
}

impl NodeKind {
    pub fn can_hold_file(&self) -> bool {
        matches!(self, NodeKind::LeafWithFile | NodeKind::ContainerWithFile)
    }

    pub fn can_have_children(&self) -> bool {
        matches!(self, NodeKind::ContainerWithFile | NodeKind::ContainerOnly)
    }
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::ContainerWithFile
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leaf" | "leaf_with_file" | "child_document" => Ok(NodeKind::LeafWithFile),
            "container" | "container_with_file" | "parent_document" => {
                Ok(NodeKind::ContainerWithFile)
            }
            "group" | "container_only" | "parent_node" => Ok(NodeKind::ContainerOnly),
            other => Err(format!("Unknown node kind: {}", other)),
        }
    }
}

/// One uploaded revision of an organigram node's file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileVersion {
    pub reference: String,
    pub file: String,
    pub uploaded_by: Principal,
    pub uploaded_at: DateTime<Utc>,
}

/// TreeNode: a category or organigram node as held by the tree store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    /// Sibling sort key (organigram); fractional values insert between siblings
    #[serde(default)]
    pub order: f64,
    #[serde(default)]
    pub kind: NodeKind,
    /// Current file reference, if any
    #[serde(default)]
    pub file: Option<String>,
    /// Folder reference string (categories)
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub versions: Vec<FileVersion>,
    #[serde(default)]
    pub share: Option<ShareState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by: Option<Principal>,
}

impl TreeNode {
    /// Create a node with the current timestamp and no file
    pub fn new(id: impl Into<NodeId>, parent: Option<NodeId>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            parent,
            name: name.into(),
            order: 0.0,
            kind: NodeKind::default(),
            file: None,
            reference: None,
            versions: Vec::new(),
            share: None,
            created_at: now,
            updated_at: now,
            updated_by: None,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn has_file(&self) -> bool {
        self.file.as_deref().map(|f| !f.is_empty()).unwrap_or(false)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Record a mutation by `principal`
    ///
    /// An anonymous mutation bumps the timestamp but keeps the last known author.
    pub fn touch(&mut self, principal: Option<&str>) {
        self.updated_at = Utc::now();
        if let Some(principal) = principal {
            self.updated_by = Some(principal.to_string());
        }
    }

    /// Reject records that can never be stored
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.id.trim().is_empty() {
            return Err(ApiError::InvalidNode("Node id cannot be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ApiError::InvalidNode(format!(
                "Node {} must have a non-empty name",
                self.id
            )));
        }
        if self.parent.as_deref() == Some(self.id.as_str()) {
            return Err(ApiError::InvalidNode(format!(
                "Node {} cannot be its own parent",
                self.id
            )));
        }
        if !self.order.is_finite() {
            return Err(ApiError::InvalidNode(format!(
                "Node {} has a non-finite order key",
                self.id
            )));
        }
        if self.has_file() && !self.kind.can_hold_file() {
            return Err(ApiError::InvalidNode(format!(
                "Node {} ({:?}) cannot hold a file",
                self.id, self.kind
            )));
        }
        Ok(())
    }
}
