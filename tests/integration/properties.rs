use std::collections::{BTreeMap, HashSet};

use arbor::access::{resolve, EffectiveMap, EffectivePermission, PermissionGrant, PermissionLevel};
use arbor::tree::{assemble, AssemblyMode};
use proptest::prelude::*;
use proptest::sample::Index;

use super::support::indexed_forest;

/// Parent indices for up to 40 nodes; node `i` points at some `j < i` or is a root
fn arb_parents() -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(any::<Option<Index>>(), 1..40).prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(i, pick)| match pick {
                Some(idx) if i > 0 => Some(idx.index(i)),
                _ => None,
            })
            .collect()
    })
}

fn arb_grants() -> impl Strategy<Value = Vec<(Index, bool)>> {
    prop::collection::vec((any::<Index>(), any::<bool>()), 0..8)
}

fn to_grants(picks: &[(Index, bool)], len: usize) -> Vec<PermissionGrant> {
    picks
        .iter()
        .map(|(idx, crud)| {
            let level = if *crud {
                PermissionLevel::Crud
            } else {
                PermissionLevel::View
            };
            PermissionGrant::new(format!("n{}", idx.index(len)), level)
        })
        .collect()
}

fn snapshot(map: &EffectiveMap) -> BTreeMap<String, EffectivePermission> {
    map.iter().map(|(id, p)| (id.clone(), *p)).collect()
}

proptest! {
    /// Admins hold crud on every node
    #[test]
    fn admin_holds_crud_everywhere(parents in arb_parents(), picks in arb_grants()) {
        let forest = indexed_forest(&parents);
        let grants = to_grants(&picks, parents.len());
        let effective = resolve(&forest, &grants, true);
        for node in forest.nodes() {
            prop_assert_eq!(effective.get(&node.id), EffectivePermission::Crud);
        }
    }

    /// An extra grant never lowers the permission of the granted subtree
    #[test]
    fn extra_grant_never_lowers_descendants(
        parents in arb_parents(),
        picks in arb_grants(),
        extra in any::<Index>(),
        crud in any::<bool>(),
    ) {
        let forest = indexed_forest(&parents);
        let grants = to_grants(&picks, parents.len());
        let before = resolve(&forest, &grants, false);

        let target = format!("n{}", extra.index(parents.len()));
        let mut widened = grants.clone();
        widened.push(if crud {
            PermissionGrant::crud(target.clone())
        } else {
            PermissionGrant::view(target.clone())
        });
        let after = resolve(&forest, &widened, false);

        let mut subtree = vec![target.clone()];
        subtree.extend(forest.descendants(&target));
        for id in subtree {
            prop_assert!(after.get(&id) >= before.get(&id), "{} lowered", id);
            prop_assert!(after.get(&id) >= EffectivePermission::View);
        }
    }

    /// Grant order does not affect the result
    #[test]
    fn grant_order_is_irrelevant(
        parents in arb_parents(),
        (picks, shuffled) in arb_grants().prop_flat_map(|g| (Just(g.clone()), Just(g).prop_shuffle())),
    ) {
        let forest = indexed_forest(&parents);
        let a = resolve(&forest, &to_grants(&picks, parents.len()), false);
        let b = resolve(&forest, &to_grants(&shuffled, parents.len()), false);
        prop_assert_eq!(snapshot(&a), snapshot(&b));
    }

    /// The pruned tree holds exactly the resolved nodes, each once, all reachable
    #[test]
    fn pruned_tree_is_connected(parents in arb_parents(), picks in arb_grants()) {
        let forest = indexed_forest(&parents);
        let effective = resolve(&forest, &to_grants(&picks, parents.len()), false);
        let tree = assemble(&forest, &effective, AssemblyMode::Pruned);

        let reached: Vec<String> = tree.iter().flat_map(|root| root.ids()).collect();
        let unique: HashSet<&String> = reached.iter().collect();
        prop_assert_eq!(unique.len(), reached.len());

        let expected: HashSet<&String> = effective.iter().map(|(id, _)| id).collect();
        prop_assert_eq!(unique, expected);
    }
}
