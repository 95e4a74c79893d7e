//! Completion accounting over the organigram
//!
//! Counts the file-eligible nodes a principal can see and lists the ones still
//! missing their file.

use crate::access::EffectiveMap;
use crate::tree::Forest;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Reference to a node missing its file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: NodeId,
    pub name: String,
    /// Names from the root down to the node
    pub path: Vec<String>,
}

/// Completion statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub total: u64,
    pub completed_count: u64,
    pub percent: u64,
    pub missing: Vec<NodeRef>,
}

/// Rounded completion percentage; `0` when there is nothing to complete
pub fn percent(completed: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u64
}

/// Aggregate completion over the nodes of `forest` that can carry a file
///
/// Only nodes the principal may view count; structural ancestors merely
/// connect the tree. Missing nodes are listed in tree traversal order.
pub fn aggregate(forest: &Forest, effective: &EffectiveMap) -> Completion {
    let mut total = 0u64;
    let mut completed_count = 0u64;
    let mut missing = Vec::new();

    for id in forest.traversal_order() {
        let Some(node) = forest.get(&id) else {
            continue;
        };
        if !node.kind.can_hold_file() || !effective.can_view(&id) {
            continue;
        }
        total += 1;
        if node.has_file() {
            completed_count += 1;
        } else {
            missing.push(NodeRef {
                path: forest.path_names(&id),
                name: node.name.clone(),
                id,
            });
        }
    }

    tracing::debug!(
        tree = %forest.kind(),
        total,
        completed = completed_count,
        "Aggregated completion"
    );
    Completion {
        total,
        completed_count,
        percent: percent(completed_count, total),
        missing,
    }
}
