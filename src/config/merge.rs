//! Source composition for configuration loading.

pub mod service;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with the built-in defaults (lowest precedence).
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("index.path", "file_index")?
        .set_default("index.follow_symlinks", false)?
        .set_default("mount.fs_name", "cairn")?
        .set_default("mount.ttl_secs", 1)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
