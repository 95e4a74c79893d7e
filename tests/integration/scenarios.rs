use arbor::access::{resolve, EffectivePermission, PermissionGrant};
use arbor::error::MoveError;
use arbor::progress::aggregate;
use arbor::tree::{assemble, validate_move, AssemblyMode, DisplayPermission};
use arbor::types::TreeKind;

use super::support::{forest, leaf, node};

fn scenario_forest() -> arbor::tree::Forest {
    forest(
        TreeKind::Category,
        vec![
            node("r", None),
            node("x", Some("r")),
            node("y", Some("r")),
            node("x1", Some("x")),
        ],
    )
}

#[test]
fn view_grant_marks_ancestors_structural() {
    let forest = scenario_forest();
    let effective = resolve(&forest, &[PermissionGrant::view("x")], false);

    assert_eq!(effective.get("r"), EffectivePermission::InheritedStructural);
    assert_eq!(effective.get("x"), EffectivePermission::View);
    assert_eq!(effective.get("x1"), EffectivePermission::View);
    assert!(!effective.includes("y"));
    assert_eq!(effective.len(), 3);

    // structural nodes authorize nothing
    assert!(!effective.can_view("r"));
    assert!(!effective.can_crud("r"));
}

#[test]
fn crud_on_root_covers_everything() {
    let forest = scenario_forest();
    let effective = resolve(&forest, &[PermissionGrant::crud("r")], false);
    for id in ["r", "x", "y", "x1"] {
        assert_eq!(effective.get(id), EffectivePermission::Crud, "{}", id);
    }
}

#[test]
fn pruned_tree_shows_structural_as_view() {
    let forest = scenario_forest();
    let effective = resolve(&forest, &[PermissionGrant::view("x")], false);
    let tree = assemble(&forest, &effective, AssemblyMode::Pruned);

    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, "r");
    assert_eq!(tree[0].permissions, DisplayPermission::View);
    assert_eq!(tree[0].ids(), vec!["r", "x", "x1"]);
}

#[test]
fn moving_parent_under_child_is_a_cycle() {
    let forest = forest(
        TreeKind::Organigram,
        vec![node("a", None), node("b", Some("a")), node("c", Some("b"))],
    );
    let effective = resolve(&forest, &[], true);

    let err = validate_move(&forest, "a", Some("b"), &effective).unwrap_err();
    assert!(matches!(err, MoveError::WouldCreateCycle { .. }));

    let err = validate_move(&forest, "b", Some("c"), &effective).unwrap_err();
    assert_eq!(
        err,
        MoveError::WouldCreateCycle {
            node: "b".to_string(),
            target: "c".to_string()
        }
    );
}

#[test]
fn move_checks_permission_before_cycle() {
    let forest = forest(
        TreeKind::Organigram,
        vec![node("a", None), node("b", Some("a")), node("z", None)],
    );
    let effective = resolve(&forest, &[PermissionGrant::crud("z")], false);

    assert_eq!(
        validate_move(&forest, "a", Some("b"), &effective),
        Err(MoveError::Forbidden("a".to_string()))
    );
    assert_eq!(
        validate_move(&forest, "missing", Some("z"), &effective),
        Err(MoveError::NotFound("missing".to_string()))
    );
    assert!(matches!(
        validate_move(&forest, "z", Some("gone"), &effective),
        Err(MoveError::InvalidTarget(_))
    ));
    assert_eq!(
        validate_move(&forest, "z", Some("a"), &effective),
        Err(MoveError::Forbidden("a".to_string()))
    );
}

#[test]
fn completion_over_four_eligible_nodes() {
    let forest = forest(
        TreeKind::Organigram,
        vec![
            node("top", None).with_kind(arbor::tree::NodeKind::ContainerOnly),
            leaf("a", Some("top")).with_order(0.0).with_file("a.pdf"),
            leaf("b", Some("top")).with_order(1.0),
            leaf("c", Some("top")).with_order(2.0),
            leaf("d", Some("top")).with_order(3.0),
        ],
    );
    let effective = resolve(&forest, &[], true);
    let completion = aggregate(&forest, &effective);

    assert_eq!(completion.total, 4);
    assert_eq!(completion.completed_count, 1);
    assert_eq!(completion.percent, 25);
    let missing: Vec<_> = completion.missing.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(missing, vec!["b", "c", "d"]);
}

#[test]
fn completion_with_nothing_eligible_is_zero() {
    let forest = forest(
        TreeKind::Organigram,
        vec![node("top", None).with_kind(arbor::tree::NodeKind::ContainerOnly)],
    );
    let effective = resolve(&forest, &[], true);
    let completion = aggregate(&forest, &effective);
    assert_eq!(completion.total, 0);
    assert_eq!(completion.percent, 0);
    assert!(completion.missing.is_empty());
}
