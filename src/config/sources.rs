//! Configuration sources layered over the built-in defaults.

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use std::path::Path;

type Builder = ConfigBuilder<DefaultState>;

/// `$XDG_CONFIG_HOME/cairn/config.toml`, skipped when absent
pub fn global_file(builder: Builder) -> Result<Builder, ConfigError> {
    match xdg::global_config_path() {
        Some(path) => Ok(builder.add_source(File::from(path.as_path()).required(false))),
        None => Ok(builder),
    }
}

/// A file named on the command line; it must exist
pub fn explicit_file(builder: Builder, path: &Path) -> Result<Builder, ConfigError> {
    Ok(builder.add_source(File::from(path).required(true)))
}

/// `CAIRN__SECTION__KEY` variables, e.g. `CAIRN__STORE__ROOT=/srv/archive`
pub fn environment(builder: Builder) -> Result<Builder, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("CAIRN")
            .separator("__")
            .try_parsing(true),
    ))
}
