use arbor::tree::{Forest, NodeKind, TreeNode};
use arbor::types::TreeKind;

/// Node whose name is its id upper-cased
pub fn node(id: &str, parent: Option<&str>) -> TreeNode {
    TreeNode::new(id, parent.map(|p| p.to_string()), id.to_uppercase())
}

pub fn leaf(id: &str, parent: Option<&str>) -> TreeNode {
    node(id, parent).with_kind(NodeKind::LeafWithFile)
}

pub fn forest(kind: TreeKind, nodes: Vec<TreeNode>) -> Forest {
    Forest::new(kind, nodes).unwrap()
}

/// Forest built from parent indices; entry `i` may only point below `i`
pub fn indexed_forest(parents: &[Option<usize>]) -> Forest {
    let nodes = parents
        .iter()
        .enumerate()
        .map(|(i, parent)| {
            let parent = parent.map(|p| format!("n{}", p));
            TreeNode::new(format!("n{}", i), parent, format!("Node {}", i)).with_order(i as f64)
        })
        .collect();
    Forest::new(TreeKind::Organigram, nodes).unwrap()
}
