//! Core types shared by the category and organigram trees.

use serde::{Deserialize, Serialize};
use std::fmt;

/// NodeId: opaque identifier of a tree node, stable for the node's lifetime
pub type NodeId = String;

/// Principal: identifier of the requesting user as yielded by the session layer
pub type Principal = String;

/// Which of the two independently maintained forests a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    /// Archive categories (folder hierarchy)
    Category,
    /// Organizational chart nodes
    Organigram,
}

impl TreeKind {
    pub const ALL: [TreeKind; 2] = [TreeKind::Category, TreeKind::Organigram];

    pub fn as_str(&self) -> &'static str {
        match self {
            TreeKind::Category => "category",
            TreeKind::Organigram => "organigram",
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TreeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" | "categories" | "archive" => Ok(TreeKind::Category),
            "organigram" | "org" => Ok(TreeKind::Organigram),
            other => Err(format!(
                "Unknown tree '{}' (expected 'category' or 'organigram')",
                other
            )),
        }
    }
}
