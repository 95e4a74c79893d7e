//! StorageConfig and database path resolution.

use crate::config::xdg;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database directory; relative paths resolve against the workspace root.
    /// Unset means the workspace's XDG data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database directory for `workspace_root`.
    pub fn resolve_path(&self, workspace_root: &Path) -> Result<PathBuf, ApiError> {
        match &self.path {
            Some(p) if p.is_absolute() => Ok(p.clone()),
            Some(p) => Ok(workspace_root.join(p)),
            None => Ok(xdg::workspace_data_dir(workspace_root)?.join("db")),
        }
    }
}
