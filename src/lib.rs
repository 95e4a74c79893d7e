//! Arbor: access control over document archives and organigrams
//!
//! Two independent forests, archive categories and the organigram, share one
//! permission model. Principals hold `view` or `crud` grants on single nodes
//! through roles; the resolver turns those into effective permissions over a
//! whole forest, the assembler builds the nested trees a caller may see, the
//! move validator keeps re-parenting acyclic, and the aggregator reports how
//! much of the organigram already carries its file.

pub mod access;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod reference;
pub mod service;
pub mod share;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;

pub use access::{resolve, EffectiveMap, EffectivePermission, GrantSet, PermissionGrant, PermissionLevel};
pub use error::{ApiError, MoveError, StorageError};
pub use service::{NewNode, TreeService};
pub use tree::{assemble, validate_move, AnnotatedNode, AssemblyMode, Forest, NodeKind, TreeNode};
pub use types::{NodeId, TreeKind};
