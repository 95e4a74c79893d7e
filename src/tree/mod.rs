//! Tree structure: node records, the forest index, presentation assembly and
//! structural validation of moves.

pub mod assembler;
pub mod forest;
pub mod moves;
pub mod node;

pub use assembler::{assemble, AnnotatedNode, AssemblyMode, DisplayPermission};
pub use forest::{compare_siblings, Forest};
pub use moves::{order_between, order_for_position, renumber_siblings, subtree_ids, validate_move};
pub use node::{FileVersion, NodeKind, TreeNode};
