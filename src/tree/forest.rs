//! In-memory forest index
//!
//! Built once per request from a bulk listing of the store. Holds the id map,
//! the children adjacency and the root list, all sorted the way siblings are
//! presented. Every traversal uses an explicit work-list bounded by the node
//! count.

use crate::error::ApiError;
use crate::tree::node::TreeNode;
use crate::types::{NodeId, TreeKind};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Sibling ordering for a tree kind
///
/// Organigram: ascending order key, ties by id. Categories: case-insensitive
/// name, ties by id.
pub fn compare_siblings(kind: TreeKind, a: &TreeNode, b: &TreeNode) -> Ordering {
    match kind {
        TreeKind::Organigram => a.order.total_cmp(&b.order).then_with(|| a.id.cmp(&b.id)),
        TreeKind::Category => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id)),
    }
}

/// Forest: immutable snapshot of one tree kind
#[derive(Debug, Clone)]
pub struct Forest {
    kind: TreeKind,
    nodes: HashMap<NodeId, TreeNode>,
    children: HashMap<NodeId, Vec<NodeId>>,
    roots: Vec<NodeId>,
}

impl Forest {
    /// Index `nodes`, rejecting duplicate ids and parent cycles
    ///
    /// A node whose parent does not exist is treated as a root.
    pub fn new(kind: TreeKind, nodes: Vec<TreeNode>) -> Result<Self, ApiError> {
        let mut map: HashMap<NodeId, TreeNode> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if map.contains_key(&node.id) {
                return Err(ApiError::Consistency(format!(
                    "duplicate {} node id {}",
                    kind, node.id
                )));
            }
            map.insert(node.id.clone(), node);
        }

        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut roots = Vec::new();
        for node in map.values() {
            match node.parent.as_ref().filter(|p| map.contains_key(*p)) {
                Some(parent) => children.entry(parent.clone()).or_default().push(node.id.clone()),
                None => roots.push(node.id.clone()),
            }
        }

        let by_kind = |a: &NodeId, b: &NodeId| compare_siblings(kind, &map[a], &map[b]);
        roots.sort_by(by_kind);
        for siblings in children.values_mut() {
            siblings.sort_by(by_kind);
        }

        let forest = Forest {
            kind,
            nodes: map,
            children,
            roots,
        };
        forest.check_acyclic()?;
        tracing::debug!(tree = %kind, nodes = forest.len(), roots = forest.roots.len(), "Forest indexed");
        Ok(forest)
    }

    /// Every node must reach a root by following parents
    fn check_acyclic(&self) -> Result<(), ApiError> {
        let mut reachable: HashSet<&NodeId> = HashSet::with_capacity(self.nodes.len());
        let mut stack: Vec<&NodeId> = self.roots.iter().collect();
        while let Some(id) = stack.pop() {
            if reachable.insert(id) {
                stack.extend(self.children(id));
            }
        }
        if reachable.len() == self.nodes.len() {
            return Ok(());
        }
        let mut stuck: Vec<&NodeId> = self
            .nodes
            .keys()
            .filter(|id| !reachable.contains(id))
            .collect();
        stuck.sort();
        Err(ApiError::Consistency(format!(
            "{} tree contains a parent cycle through {}",
            self.kind,
            stuck
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    /// Roots in sibling order, including orphans
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `id` in sibling order
    pub fn children(&self, id: &str) -> &[NodeId] {
        self.children.get(id).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Parent of `id` if it exists in this forest
    pub fn parent_of(&self, id: &str) -> Option<&NodeId> {
        self.nodes
            .get(id)
            .and_then(|n| n.parent.as_ref())
            .filter(|p| self.nodes.contains_key(*p))
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if !seen.insert(parent.as_str()) {
                break;
            }
            out.push(parent.clone());
            current = self.parent_of(parent);
        }
        out
    }

    /// Descendants of `id` in pre-order, excluding `id`
    pub fn descendants(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);
        let mut stack: Vec<&NodeId> = self.children(id).iter().rev().collect();
        while let Some(next) = stack.pop() {
            if !seen.insert(next.as_str()) {
                continue;
            }
            out.push(next.clone());
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// True if `candidate` lies in the subtree below `ancestor`
    pub fn is_descendant(&self, ancestor: &str, candidate: &str) -> bool {
        self.ancestors(candidate).iter().any(|a| a == ancestor)
    }

    /// Names from the root down to `id` inclusive
    pub fn path_names(&self, id: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .ancestors(id)
            .iter()
            .rev()
            .filter_map(|a| self.nodes.get(a).map(|n| n.name.clone()))
            .collect();
        names.push(node.name.clone());
        names
    }

    /// All node ids in depth-first pre-order, roots and siblings in sibling order
    pub fn traversal_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        let mut stack: Vec<&NodeId> = self.roots.iter().rev().collect();
        while let Some(next) = stack.pop() {
            if !seen.insert(next.as_str()) {
                continue;
            }
            out.push(next.clone());
            stack.extend(self.children(next).iter().rev());
        }
        out
    }
}
