//! Permission resolution
//!
//! Expands explicit grants down every subtree and then closes the result over
//! ancestors so a filtered tree stays connected. The effective level of a node
//! is the maximum of its own grant and every ancestor's grant, which makes the
//! result independent of the order grants are supplied in.

use crate::access::{EffectiveMap, EffectivePermission, PermissionGrant, PermissionLevel};
use crate::tree::Forest;
use crate::types::NodeId;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Resolve the effective permission of every node of `forest`
///
/// Grants on nodes absent from the forest are ignored.
pub fn resolve(forest: &Forest, grants: &[PermissionGrant], is_admin: bool) -> EffectiveMap {
    if is_admin {
        let entries = forest
            .nodes()
            .map(|n| (n.id.clone(), EffectivePermission::Crud))
            .collect();
        return EffectiveMap::new(true, entries);
    }

    let explicit = explicit_levels(forest, grants);
    let mut entries = propagate(forest, &explicit);
    close_over_ancestors(forest, &mut entries);

    debug!(
        tree = %forest.kind(),
        grants = grants.len(),
        explicit = explicit.len(),
        visible = entries.len(),
        "Resolved permissions"
    );
    EffectiveMap::new(false, entries)
}

/// Strongest explicit grant per existing node
fn explicit_levels<'a>(
    forest: &Forest,
    grants: &'a [PermissionGrant],
) -> HashMap<&'a str, PermissionLevel> {
    let mut explicit: HashMap<&str, PermissionLevel> = HashMap::new();
    for grant in grants {
        if !forest.contains(&grant.node) {
            debug!(tree = %forest.kind(), node = %grant.node, "Ignoring grant on missing node");
            continue;
        }
        explicit
            .entry(grant.node.as_str())
            .and_modify(|level| *level = (*level).max(grant.level))
            .or_insert(grant.level);
    }
    explicit
}

/// Top-down walk carrying the strongest level granted on any ancestor
fn propagate(
    forest: &Forest,
    explicit: &HashMap<&str, PermissionLevel>,
) -> HashMap<NodeId, EffectivePermission> {
    let mut entries = HashMap::new();
    if explicit.is_empty() {
        return entries;
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(forest.len());
    let mut stack: Vec<(&NodeId, Option<PermissionLevel>)> =
        forest.roots().iter().map(|r| (r, None)).collect();
    while let Some((id, inherited)) = stack.pop() {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let own = explicit.get(id.as_str()).copied();
        let level = match (own, inherited) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        if let Some(level) = level {
            entries.insert(id.clone(), EffectivePermission::from(level));
        }
        for child in forest.children(id) {
            stack.push((child, level));
        }
    }
    entries
}

/// Mark every missing ancestor of a visible node as structural
fn close_over_ancestors(forest: &Forest, entries: &mut HashMap<NodeId, EffectivePermission>) {
    let granted: Vec<NodeId> = entries
        .iter()
        .filter(|(_, p)| p.allows_view())
        .map(|(id, _)| id.clone())
        .collect();
    // Stop at the first ancestor already present; everything above it is
    // already connected, so each node is inserted at most once.
    for id in granted {
        let mut cursor = forest.parent_of(&id);
        while let Some(ancestor) = cursor {
            if entries.contains_key(ancestor) {
                break;
            }
            entries.insert(ancestor.clone(), EffectivePermission::InheritedStructural);
            cursor = forest.parent_of(ancestor);
        }
    }
}
