//! Configuration
//!
//! Layered configuration built with the `config` crate. Precedence, lowest to
//! highest: built-in defaults, global file, workspace file, `ARBOR__*`
//! environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod storage;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use storage::StorageConfig;

use crate::logging::LoggingConfig;
use crate::reference::ReferenceFormat;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArborConfig {
    /// Reference string formatting for folders and file versions
    #[serde(default)]
    pub reference: ReferenceFormat,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::CategoryMode;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ArborConfig = toml::from_str(
            r#"
            [reference]
            separator = "-"
            category_mode = "last"
            "#,
        )
        .unwrap();
        assert_eq!(config.reference.separator, "-");
        assert_eq!(config.reference.category_mode, CategoryMode::Last);
        assert_eq!(config.reference.sequence_length, 4);
        assert_eq!(config.logging.level, "info");
        assert!(config.storage.path.is_none());
    }
}
