//! Built-in defaults seeded into every builder.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

/// Builder pre-populated with defaults for keys the environment may override.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("reference.sequence_length", 4)?
        .set_default("reference.category_mode", "all")?
        .set_default("reference.separator", "/")?
        .set_default("reference.pattern", "")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "file")
}
