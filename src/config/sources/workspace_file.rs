//! Workspace config file: <workspace>/arbor.toml (optional)

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = workspace_root.join("arbor.toml");
    Ok(builder.add_source(File::from(path).required(false)))
}
