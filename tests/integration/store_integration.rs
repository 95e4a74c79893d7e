use arbor::error::ApiError;
use arbor::store::{MemoryTreeStore, SledTreeStore, TreeStore};
use arbor::types::TreeKind;
use tempfile::TempDir;

use super::support::node;

fn exercise(store: &dyn TreeStore) {
    store.put_node(TreeKind::Organigram, &node("a", None)).unwrap();
    store.put_node(TreeKind::Organigram, &node("b", Some("a"))).unwrap();
    store.put_node(TreeKind::Organigram, &node("c", Some("a"))).unwrap();
    store.put_node(TreeKind::Category, &node("a", None)).unwrap();

    let mut children: Vec<_> = store
        .get_children(TreeKind::Organigram, "a")
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    children.sort();
    assert_eq!(children, vec!["b", "c"]);

    assert!(store
        .apply_move(TreeKind::Organigram, "c", Some("b"), Some(2.5))
        .unwrap());
    assert!(!store
        .apply_move(TreeKind::Organigram, "zz", None, None)
        .unwrap());
    let moved = store.get_node(TreeKind::Organigram, "c").unwrap().unwrap();
    assert_eq!(moved.parent.as_deref(), Some("b"));
    assert_eq!(moved.order, 2.5);

    let forest = store.forest(TreeKind::Organigram).unwrap();
    assert_eq!(forest.ancestors("c"), vec!["b", "a"]);

    let removed = store
        .delete_subtree(TreeKind::Organigram, &["b".to_string(), "c".to_string()])
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.list_all_nodes(TreeKind::Organigram).unwrap().len(), 1);
    // trees are independent
    assert_eq!(store.list_all_nodes(TreeKind::Category).unwrap().len(), 1);
}

#[test]
fn memory_store_contract() {
    exercise(&MemoryTreeStore::new());
}

#[test]
fn sled_store_contract() {
    let temp = TempDir::new().unwrap();
    exercise(&SledTreeStore::open(temp.path()).unwrap());
}

#[test]
fn stored_cycle_is_reported() {
    let store = MemoryTreeStore::new();
    store.put_node(TreeKind::Organigram, &node("a", Some("b"))).unwrap();
    store.put_node(TreeKind::Organigram, &node("b", Some("a"))).unwrap();
    let err = store.forest(TreeKind::Organigram).unwrap_err();
    assert!(matches!(err, ApiError::Consistency(_)));
    assert_eq!(err.status_code(), 500);
}
