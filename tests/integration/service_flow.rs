use std::sync::Arc;

use arbor::access::{GrantSet, GrantSupplier, PermissionLevel, Role, RoleDirectory};
use arbor::config::ArborConfig;
use arbor::error::ApiError;
use arbor::service::{NewNode, TreeService};
use arbor::store::{RoleStore, SledTreeStore, TreeStore};
use arbor::access::role::Assignment;
use arbor::tree::{DisplayPermission, NodeKind};
use arbor::types::TreeKind;
use tempfile::TempDir;

fn sled_service(temp: &TempDir) -> (TreeService<SledTreeStore>, Arc<SledTreeStore>) {
    let store = Arc::new(SledTreeStore::open(&temp.path().join("db")).unwrap());
    let service = TreeService::new(store.clone(), ArborConfig::default())
        .with_roles(RoleDirectory::new(store.clone()));
    (service, store)
}

#[test]
fn archive_lifecycle_with_role_grants() {
    let temp = TempDir::new().unwrap();
    let (service, store) = sled_service(&temp);
    let admin = GrantSet::admin();

    let main = service
        .create_node(TreeKind::Category, &admin, NewNode::new("main", None, "Main"))
        .unwrap();
    assert_eq!(main.reference.as_deref(), Some("0001/Main"));
    let second = service
        .create_node(TreeKind::Category, &admin, NewNode::new("other", None, "Other"))
        .unwrap();
    assert_eq!(second.reference.as_deref(), Some("0002/Other"));

    let mut clerks = Role::new("clerks");
    clerks.grant(TreeKind::Category, "main", PermissionLevel::Crud);
    store.put_role(&clerks).unwrap();
    store
        .assign(&Assignment {
            principal: "dana".to_string(),
            roles: vec!["clerks".to_string()],
        })
        .unwrap();

    let directory = RoleDirectory::new(store.clone());
    let dana = directory.grants_for("dana", TreeKind::Category).unwrap();
    assert!(!dana.is_admin);

    let letters = service
        .create_node(
            TreeKind::Category,
            &dana,
            NewNode::new("letters", Some("main".to_string()), "Letters"),
        )
        .unwrap();
    assert_eq!(letters.kind, NodeKind::ContainerOnly);
    assert_eq!(letters.reference.as_deref(), Some("0001/Main/Letters"));

    // the new folder inherited the clerks' grant
    let dana = directory.grants_for("dana", TreeKind::Category).unwrap();
    assert!(dana
        .grants
        .iter()
        .any(|g| g.node == "letters" && g.level == PermissionLevel::Crud));

    let err = service
        .create_node(TreeKind::Category, &dana, NewNode::new("top", None, "Top"))
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let visible = service.tree(TreeKind::Category, &dana).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].ids(), vec!["main", "letters"]);

    let removed = service.delete_node(TreeKind::Category, &dana, "main").unwrap();
    assert_eq!(removed, 2);
    let clerks = store.get_role("clerks").unwrap().unwrap();
    assert!(clerks.archive_categories.is_empty());
    assert_eq!(store.list_all_nodes(TreeKind::Category).unwrap().len(), 1);
}

#[test]
fn categories_sort_by_name_regardless_of_creation() {
    let temp = TempDir::new().unwrap();
    let (service, _) = sled_service(&temp);
    let admin = GrantSet::admin();
    for (id, name) in [("z", "zeta"), ("a", "Alpha"), ("m", "mid")] {
        service
            .create_node(TreeKind::Category, &admin, NewNode::new(id, None, name))
            .unwrap();
    }
    let tree = service.public_tree(TreeKind::Category).unwrap();
    let names: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "mid", "zeta"]);
    assert!(tree
        .iter()
        .all(|n| n.permissions == DisplayPermission::DisplayAdmin));
}

#[test]
fn organigram_reorder_and_completion() {
    let temp = TempDir::new().unwrap();
    let (service, _) = sled_service(&temp);
    let admin = GrantSet::admin();

    service
        .create_node(
            TreeKind::Organigram,
            &admin,
            NewNode::new("ceo", None, "CEO").with_kind(NodeKind::ContainerOnly),
        )
        .unwrap();
    for id in ["cfo", "cto", "coo"] {
        service
            .create_node(
                TreeKind::Organigram,
                &admin,
                NewNode::new(id, Some("ceo".to_string()), id.to_uppercase())
                    .with_kind(NodeKind::LeafWithFile),
            )
            .unwrap();
    }

    service
        .move_node(TreeKind::Organigram, &admin, "coo", Some("ceo"), Some(0))
        .unwrap();
    let tree = service.tree(TreeKind::Organigram, &admin).unwrap();
    assert_eq!(tree[0].ids(), vec!["ceo", "coo", "cfo", "cto"]);

    service
        .attach_file(&admin, "cto", "cto.pdf", "root")
        .unwrap();
    let completion = service.progress(&admin).unwrap();
    assert_eq!(completion.total, 3);
    assert_eq!(completion.completed_count, 1);
    assert_eq!(completion.percent, 33);
    let missing: Vec<_> = completion.missing.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(missing, vec!["coo", "cfo"]);

    let err = service
        .move_node(TreeKind::Organigram, &admin, "ceo", Some("cfo"), None)
        .unwrap_err();
    assert!(matches!(err, ApiError::WouldCreateCycle { .. }));

    let err = service
        .move_node(TreeKind::Organigram, &admin, "coo", Some("cfo"), None)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidTarget(_)));
}

#[test]
fn unknown_principal_sees_nothing() {
    let temp = TempDir::new().unwrap();
    let (service, store) = sled_service(&temp);
    service
        .create_node(
            TreeKind::Organigram,
            &GrantSet::admin(),
            NewNode::new("ceo", None, "CEO"),
        )
        .unwrap();

    let directory = RoleDirectory::new(store);
    let stranger = directory.grants_for("nobody", TreeKind::Organigram).unwrap();
    assert_eq!(stranger, GrantSet::anonymous());
    assert!(service.tree(TreeKind::Organigram, &stranger).unwrap().is_empty());
    assert_eq!(service.progress(&stranger).unwrap().percent, 0);
}
