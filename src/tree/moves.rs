//! Move validation and sibling ordering
//!
//! A re-parent is checked against existence, crud permission on both ends and
//! cycle formation before the store applies it. The cycle check is what keeps
//! the parent graph a forest.

use crate::access::EffectiveMap;
use crate::error::MoveError;
use crate::tree::forest::Forest;
use crate::types::NodeId;

/// Smallest gap between neighbouring order keys before siblings are renumbered
pub const MIN_ORDER_GAP: f64 = 1e-6;

/// Validate moving `node` under `new_parent` (`None` moves it to the root)
///
/// Checks run in order and stop at the first failure: node exists, crud on
/// node, target exists, crud on target, no cycle, target accepts children.
/// Moving to the root only needs crud on the node itself.
pub fn validate_move(
    forest: &Forest,
    node: &str,
    new_parent: Option<&str>,
    perms: &EffectiveMap,
) -> Result<(), MoveError> {
    if !forest.contains(node) {
        return Err(MoveError::NotFound(node.to_string()));
    }
    if !perms.can_crud(node) {
        return Err(MoveError::Forbidden(node.to_string()));
    }

    let Some(target) = new_parent else {
        return Ok(());
    };

    let Some(target_node) = forest.get(target) else {
        return Err(MoveError::InvalidTarget(format!(
            "target {} does not exist",
            target
        )));
    };
    if !perms.can_crud(target) {
        return Err(MoveError::Forbidden(target.to_string()));
    }
    if target == node || forest.is_descendant(node, target) {
        return Err(MoveError::WouldCreateCycle {
            node: node.to_string(),
            target: target.to_string(),
        });
    }
    if !target_node.kind.can_have_children() {
        return Err(MoveError::InvalidTarget(format!(
            "target {} ({:?}) cannot have children",
            target, target_node.kind
        )));
    }
    Ok(())
}

/// Order key between two neighbours
///
/// Midpoint when both exist, `±0.5` past a single neighbour, `0.0` alone.
pub fn order_between(before: Option<f64>, after: Option<f64>) -> f64 {
    match (before, after) {
        (Some(a), Some(b)) => a + (b - a) / 2.0,
        (Some(a), None) => a + 0.5,
        (None, Some(b)) => b - 0.5,
        (None, None) => 0.0,
    }
}

/// Where a moved node lands among its new siblings
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    /// Order key for the moved node
    pub order: f64,
    /// Sibling keys to rewrite when the fractional gap ran out; empty otherwise
    pub renumber: Vec<(NodeId, f64)>,
}

/// Plan the order key for placing `moving` at `index` among the children of
/// `parent` (roots when `None`). `index` past the end appends.
pub fn order_for_position(
    forest: &Forest,
    parent: Option<&str>,
    moving: &str,
    index: usize,
) -> OrderPlan {
    let siblings: Vec<&NodeId> = match parent {
        Some(p) => forest.children(p).iter(),
        None => forest.roots().iter(),
    }
    .filter(|id| id.as_str() != moving)
    .collect();

    let index = index.min(siblings.len());
    let key = |i: usize| forest.get(siblings[i]).map(|n| n.order);
    let before = if index > 0 { key(index - 1) } else { None };
    let after = if index < siblings.len() { key(index) } else { None };
    let order = order_between(before, after);

    let exhausted = match (before, after) {
        (Some(a), Some(b)) => (b - a).abs() < MIN_ORDER_GAP || order <= a || order >= b,
        _ => false,
    };
    if !exhausted {
        return OrderPlan {
            order,
            renumber: Vec::new(),
        };
    }

    let mut sequence: Vec<NodeId> = siblings.iter().map(|s| (*s).clone()).collect();
    sequence.insert(index, moving.to_string());
    let renumber = renumber_siblings(&sequence);
    tracing::debug!(siblings = renumber.len(), "Order keys exhausted, renumbering siblings");
    OrderPlan {
        order: index as f64,
        renumber,
    }
}

/// Contiguous integral order keys for `siblings` in the given order
pub fn renumber_siblings(siblings: &[NodeId]) -> Vec<(NodeId, f64)> {
    siblings
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i as f64))
        .collect()
}

/// `root` followed by all of its descendants in pre-order; empty when absent
pub fn subtree_ids(forest: &Forest, root: &str) -> Vec<NodeId> {
    if !forest.contains(root) {
        return Vec::new();
    }
    let mut ids = vec![root.to_string()];
    ids.extend(forest.descendants(root));
    ids
}
