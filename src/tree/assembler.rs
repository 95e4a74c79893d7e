//! Tree assembly
//!
//! Turns a forest plus resolved permissions into the nested structure handed
//! to presentation. The assembler links nodes only; it never decides access.

use crate::access::{EffectiveMap, EffectivePermission};
use crate::tree::forest::Forest;
use crate::tree::node::{FileVersion, NodeKind, TreeNode};
use crate::types::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Permission annotation for rendering; never an authorization input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPermission {
    View,
    Crud,
    /// Shown by unauthenticated listings
    #[serde(rename = "admin")]
    DisplayAdmin,
}

impl DisplayPermission {
    fn for_effective(permission: EffectivePermission) -> Self {
        match permission {
            EffectivePermission::Crud => DisplayPermission::Crud,
            _ => DisplayPermission::View,
        }
    }
}

/// Which nodes to include
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// Every node, each annotated with `annotation`
    Full { annotation: DisplayPermission },
    /// Only nodes present in the effective map
    Pruned,
}

/// Node with its ordered children and display annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub order: f64,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub versions: Vec<FileVersion>,
    pub has_file: bool,
    pub updated_at: DateTime<Utc>,
    pub permissions: DisplayPermission,
    pub children: Vec<AnnotatedNode>,
}

impl AnnotatedNode {
    fn from_node(node: &TreeNode, permissions: DisplayPermission) -> Self {
        Self {
            id: node.id.clone(),
            parent: node.parent.clone(),
            name: node.name.clone(),
            order: node.order,
            kind: node.kind,
            file: node.file.clone(),
            reference: node.reference.clone(),
            versions: node.versions.clone(),
            has_file: node.has_file(),
            updated_at: node.updated_at,
            permissions,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter());
        }
        total
    }

    /// Ids of this subtree in pre-order
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.id.clone());
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Assemble `forest` into nested trees according to `mode`
///
/// Each included node hangs under its nearest included ancestor; one without
/// any becomes a root of the output. Built bottom-up from the pre-order
/// listing so no recursion depth depends on the tree's depth.
pub fn assemble(forest: &Forest, effective: &EffectiveMap, mode: AssemblyMode) -> Vec<AnnotatedNode> {
    let included = |id: &str| match mode {
        AssemblyMode::Full { .. } => true,
        AssemblyMode::Pruned => effective.includes(id),
    };
    let annotate = |id: &str| match mode {
        AssemblyMode::Full { annotation } => annotation,
        AssemblyMode::Pruned => DisplayPermission::for_effective(effective.get(id)),
    };

    // Pre-order walk carrying the nearest included ancestor, so each node is
    // linked in constant time whatever the depth.
    let mut order: Vec<NodeId> = Vec::new();
    let mut roots: Vec<NodeId> = Vec::new();
    let mut linked: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(forest.len());
    let mut stack: Vec<(&NodeId, Option<&NodeId>)> =
        forest.roots().iter().rev().map(|r| (r, None)).collect();
    while let Some((id, nearest)) = stack.pop() {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let below = if included(id.as_str()) {
            match nearest {
                Some(parent) => linked.entry(parent.clone()).or_default().push(id.clone()),
                None => roots.push(id.clone()),
            }
            order.push(id.clone());
            Some(id)
        } else {
            nearest
        };
        stack.extend(forest.children(id).iter().rev().map(|c| (c, below)));
    }

    let mut built: HashMap<NodeId, AnnotatedNode> = HashMap::with_capacity(order.len());
    for id in order.iter().rev() {
        let Some(node) = forest.get(id) else {
            continue;
        };
        let mut out = AnnotatedNode::from_node(node, annotate(id));
        if let Some(children) = linked.remove(id) {
            out.children = children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
        }
        built.insert(id.clone(), out);
    }

    let trees: Vec<AnnotatedNode> = roots.iter().filter_map(|r| built.remove(r)).collect();

    tracing::debug!(
        tree = %forest.kind(),
        roots = trees.len(),
        nodes = order.len(),
        "Assembled tree"
    );
    trees
}
