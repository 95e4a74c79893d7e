//! Tree Service
//!
//! Entry point for controllers. Every request reads its tree once into a
//! `Forest`, resolves the caller's grant set against it and hands the snapshot
//! to the core: the assembler for listings, the move validator for re-parents
//! and the aggregator for completion. Mutations run under the tree's write lock
//! and are validated again against a fresh snapshot taken inside the lock.

use crate::access::{resolve, EffectiveMap, GrantSet, RoleDirectory};
use crate::concurrency::TreeLockManager;
use crate::config::ArborConfig;
use crate::error::ApiError;
use crate::progress::{aggregate, Completion, NodeRef};
use crate::reference::{next_folder_reference, version_reference};
use crate::share::ShareState;
use crate::tree::{
    assemble, order_between, order_for_position, subtree_ids, validate_move, AnnotatedNode,
    AssemblyMode, DisplayPermission, FileVersion, Forest, NodeKind, TreeNode,
};
use crate::store::TreeStore;
use crate::types::{NodeId, Principal, TreeKind};
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request to create a node
#[derive(Debug, Clone)]
pub struct NewNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    /// Ignored for categories, which are always `ContainerOnly`
    pub kind: NodeKind,
    pub created_by: Option<Principal>,
}

impl NewNode {
    pub fn new(id: impl Into<NodeId>, parent: Option<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent,
            name: name.into(),
            kind: NodeKind::default(),
            created_by: None,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn created_by(mut self, principal: impl Into<Principal>) -> Self {
        self.created_by = Some(principal.into());
        self
    }
}

/// Access engine over a tree store
pub struct TreeService<S: TreeStore> {
    store: Arc<S>,
    config: ArborConfig,
    locks: TreeLockManager,
    roles: Option<RoleDirectory>,
}

impl<S: TreeStore> TreeService<S> {
    pub fn new(store: Arc<S>, config: ArborConfig) -> Self {
        Self {
            store,
            config,
            locks: TreeLockManager::new(),
            roles: None,
        }
    }

    /// Keep role grants in step with created and deleted nodes
    pub fn with_roles(mut self, roles: RoleDirectory) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    fn snapshot(&self, kind: TreeKind) -> Result<Forest, ApiError> {
        let forest = self.store.forest(kind)?;
        debug!(tree = %kind, nodes = forest.len(), "Loaded forest snapshot");
        Ok(forest)
    }

    fn effective(&self, forest: &Forest, grants: &GrantSet) -> EffectiveMap {
        if !grants.is_admin {
            let dangling = grants
                .grants
                .iter()
                .filter(|g| !forest.contains(&g.node))
                .count();
            if dangling > 0 {
                warn!(tree = %forest.kind(), dangling, "Ignoring grants on unknown nodes");
            }
        }
        resolve(forest, &grants.grants, grants.is_admin)
    }

    /// Tree as the caller may see it: everything for admins, pruned otherwise
    pub fn tree(&self, kind: TreeKind, grants: &GrantSet) -> Result<Vec<AnnotatedNode>, ApiError> {
        let forest = self.snapshot(kind)?;
        let effective = self.effective(&forest, grants);
        let mode = if grants.is_admin {
            AssemblyMode::Full {
                annotation: DisplayPermission::Crud,
            }
        } else {
            AssemblyMode::Pruned
        };
        Ok(assemble(&forest, &effective, mode))
    }

    /// Unfiltered listing for anonymous browsing
    ///
    /// Every node carries the `admin` display hint; it grants nothing.
    pub fn public_tree(&self, kind: TreeKind) -> Result<Vec<AnnotatedNode>, ApiError> {
        let forest = self.snapshot(kind)?;
        let effective = resolve(&forest, &[], true);
        Ok(assemble(
            &forest,
            &effective,
            AssemblyMode::Full {
                annotation: DisplayPermission::DisplayAdmin,
            },
        ))
    }

    /// Organigram completion for the caller
    pub fn progress(&self, grants: &GrantSet) -> Result<Completion, ApiError> {
        let forest = self.snapshot(TreeKind::Organigram)?;
        let effective = self.effective(&forest, grants);
        Ok(aggregate(&forest, &effective))
    }

    /// Organigram nodes the caller can see that still lack a file
    pub fn missing(&self, grants: &GrantSet) -> Result<Vec<NodeRef>, ApiError> {
        Ok(self.progress(grants)?.missing)
    }

    /// Create a node
    ///
    /// Roots need the admin role. A child needs crud on its parent, and the
    /// parent must accept children. Categories receive the next folder
    /// reference; organigram nodes are appended after their last sibling.
    pub fn create_node(
        &self,
        kind: TreeKind,
        grants: &GrantSet,
        request: NewNode,
    ) -> Result<TreeNode, ApiError> {
        let lock = self.locks.get_lock(kind);
        let _guard = lock.write();

        let forest = self.snapshot(kind)?;
        let effective = self.effective(&forest, grants);

        if forest.contains(&request.id) {
            return Err(ApiError::InvalidNode(format!(
                "Node {} already exists",
                request.id
            )));
        }
        match request.parent.as_deref() {
            None if !effective.is_admin() => {
                return Err(ApiError::Forbidden(
                    "only admins may create root nodes".to_string(),
                ))
            }
            None => {}
            Some(parent) => {
                let parent_node = forest
                    .get(parent)
                    .ok_or_else(|| ApiError::NotFound(parent.to_string()))?;
                require_crud(&effective, parent)?;
                if !parent_node.kind.can_have_children() {
                    return Err(ApiError::InvalidTarget(format!(
                        "parent {} ({:?}) cannot have children",
                        parent, parent_node.kind
                    )));
                }
            }
        }

        let mut node = TreeNode::new(request.id, request.parent, request.name);
        node.touch(request.created_by.as_deref());
        match kind {
            TreeKind::Category => {
                node.kind = NodeKind::ContainerOnly;
                node.reference = Some(next_folder_reference(
                    &forest,
                    node.parent.as_deref(),
                    &node.name,
                    &self.config.reference,
                    node.created_at.year(),
                ));
            }
            TreeKind::Organigram => {
                node.kind = request.kind;
                let siblings = match node.parent.as_deref() {
                    Some(p) => forest.children(p),
                    None => forest.roots(),
                };
                let last = siblings
                    .iter()
                    .filter_map(|id| forest.get(id))
                    .map(|n| n.order)
                    .fold(None, |max: Option<f64>, o| Some(max.map_or(o, |m| m.max(o))));
                node.order = order_between(last, None);
            }
        }
        node.validate()?;
        self.store.put_node(kind, &node)?;

        if let (Some(roles), Some(parent)) = (&self.roles, node.parent.as_deref()) {
            if kind == TreeKind::Category {
                roles.propagate_to_child(kind, parent, &node.id)?;
            }
        }
        info!(tree = %kind, node = %node.id, parent = ?node.parent, "Created node");
        Ok(node)
    }

    /// Re-parent `id` under `new_parent` (root when `None`)
    ///
    /// `position` is the index among the new siblings; `None` appends.
    pub fn move_node(
        &self,
        kind: TreeKind,
        grants: &GrantSet,
        id: &str,
        new_parent: Option<&str>,
        position: Option<usize>,
    ) -> Result<TreeNode, ApiError> {
        // Reject early without blocking other writers.
        {
            let forest = self.snapshot(kind)?;
            let effective = self.effective(&forest, grants);
            validate_move(&forest, id, new_parent, &effective)?;
        }

        let lock = self.locks.get_lock(kind);
        let _guard = lock.write();

        let forest = self.snapshot(kind)?;
        let effective = self.effective(&forest, grants);
        validate_move(&forest, id, new_parent, &effective)?;

        let plan = order_for_position(&forest, new_parent, id, position.unwrap_or(usize::MAX));
        let mut moved = forest
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        moved.parent = new_parent.map(|p| p.to_string());
        moved.order = plan.order;

        // The moved node and any renumbered siblings land in one write.
        let mut writes = Vec::with_capacity(plan.renumber.len() + 1);
        writes.push(moved.clone());
        for (sibling, order) in plan.renumber.iter().filter(|(s, _)| s != id) {
            if let Some(node) = forest.get(sibling) {
                let mut node = node.clone();
                node.order = *order;
                writes.push(node);
            }
        }
        self.store.put_nodes(kind, &writes)?;

        info!(
            tree = %kind,
            node = id,
            parent = ?new_parent,
            order = moved.order,
            renumbered = plan.renumber.len(),
            "Moved node"
        );
        Ok(moved)
    }

    pub fn rename_node(
        &self,
        kind: TreeKind,
        grants: &GrantSet,
        id: &str,
        name: &str,
        principal: Option<&str>,
    ) -> Result<TreeNode, ApiError> {
        self.update_node(kind, grants, id, principal, |node, _| {
            node.name = name.to_string();
            Ok(())
        })
    }

    /// Change an organigram node's kind
    ///
    /// A node keeping children must stay a container, one keeping its file must
    /// stay file-capable.
    pub fn set_kind(
        &self,
        grants: &GrantSet,
        id: &str,
        kind: NodeKind,
        principal: Option<&str>,
    ) -> Result<TreeNode, ApiError> {
        self.update_node(TreeKind::Organigram, grants, id, principal, |node, forest| {
            if !kind.can_have_children() && !forest.children(&node.id).is_empty() {
                return Err(ApiError::InvalidNode(format!(
                    "Node {} has children and cannot become {:?}",
                    node.id, kind
                )));
            }
            if !kind.can_hold_file() && node.has_file() {
                return Err(ApiError::InvalidNode(format!(
                    "Node {} holds a file and cannot become {:?}",
                    node.id, kind
                )));
            }
            node.kind = kind;
            Ok(())
        })
    }

    /// Delete `id` and its whole subtree; returns the number of removed nodes
    pub fn delete_node(
        &self,
        kind: TreeKind,
        grants: &GrantSet,
        id: &str,
    ) -> Result<usize, ApiError> {
        let lock = self.locks.get_lock(kind);
        let _guard = lock.write();

        let forest = self.snapshot(kind)?;
        let effective = self.effective(&forest, grants);
        if !forest.contains(id) {
            return Err(ApiError::NotFound(id.to_string()));
        }
        require_crud(&effective, id)?;

        let ids = subtree_ids(&forest, id);
        let removed = self.store.delete_subtree(kind, &ids)?;
        if let Some(roles) = &self.roles {
            roles.prune(kind, &ids)?;
        }
        info!(tree = %kind, node = id, removed, "Deleted subtree");
        Ok(removed)
    }

    /// Upload a new file revision to an organigram node
    pub fn attach_file(
        &self,
        grants: &GrantSet,
        id: &str,
        file: &str,
        uploaded_by: &str,
    ) -> Result<TreeNode, ApiError> {
        let format = self.config.reference.clone();
        self.update_node(
            TreeKind::Organigram,
            grants,
            id,
            Some(uploaded_by),
            |node, forest| {
                if !node.kind.can_hold_file() {
                    return Err(ApiError::InvalidNode(format!(
                        "Node {} ({:?}) cannot hold a file",
                        node.id, node.kind
                    )));
                }
                let uploaded_at = Utc::now();
                let reference = version_reference(forest, &node.id, &format, uploaded_at.year())
                    .ok_or_else(|| ApiError::NotFound(node.id.clone()))?;
                node.versions.push(FileVersion {
                    reference,
                    file: file.to_string(),
                    uploaded_by: uploaded_by.to_string(),
                    uploaded_at,
                });
                node.file = Some(file.to_string());
                Ok(())
            },
        )
    }

    /// Enable a public share link on `id`
    pub fn share_node(
        &self,
        kind: TreeKind,
        grants: &GrantSet,
        id: &str,
        seed: &[u8],
        expires_at: Option<DateTime<Utc>>,
        password_hash: Option<String>,
        principal: Option<&str>,
    ) -> Result<ShareState, ApiError> {
        let node = self.update_node(kind, grants, id, principal, |node, _| {
            node.share = Some(ShareState::enable(seed, expires_at, password_hash));
            Ok(())
        })?;
        node.share
            .ok_or_else(|| ApiError::Consistency(format!("share state lost on {}", id)))
    }

    pub fn unshare_node(
        &self,
        kind: TreeKind,
        grants: &GrantSet,
        id: &str,
        principal: Option<&str>,
    ) -> Result<TreeNode, ApiError> {
        self.update_node(kind, grants, id, principal, |node, _| {
            if let Some(share) = node.share.as_mut() {
                share.disable();
            }
            Ok(())
        })
    }

    /// Node behind a share link, independent of any grants
    pub fn open_shared(
        &self,
        kind: TreeKind,
        id: &str,
        token: &str,
        password_hash: Option<&str>,
    ) -> Result<TreeNode, ApiError> {
        let node = self
            .store
            .get_node(kind, id)?
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let share = node
            .share
            .as_ref()
            .ok_or_else(|| ApiError::ShareDenied("node is not shared".to_string()))?;
        share.check(token, Utc::now(), password_hash)?;
        Ok(node)
    }

    /// Lock, re-read, check crud on `id`, mutate and store
    fn update_node<F>(
        &self,
        kind: TreeKind,
        grants: &GrantSet,
        id: &str,
        principal: Option<&str>,
        mutate: F,
    ) -> Result<TreeNode, ApiError>
    where
        F: FnOnce(&mut TreeNode, &Forest) -> Result<(), ApiError>,
    {
        let lock = self.locks.get_lock(kind);
        let _guard = lock.write();

        let forest = self.snapshot(kind)?;
        let effective = self.effective(&forest, grants);
        let mut node = forest
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        require_crud(&effective, id)?;

        mutate(&mut node, &forest)?;
        node.touch(principal);
        node.validate()?;
        self.store.put_node(kind, &node)?;
        info!(tree = %kind, node = id, "Updated node");
        Ok(node)
    }
}

fn require_crud(effective: &EffectiveMap, id: &str) -> Result<(), ApiError> {
    if effective.can_crud(id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "crud permission required on {}",
            id
        )))
    }
}
