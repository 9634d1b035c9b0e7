//! MergeService: orchestrates sources, applies merge policy, deserializes to CairnConfig.

use crate::config::sources;
use crate::config::CairnConfig;
use config::ConfigError;
use std::path::Path;

use super::builder_with_defaults;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> explicit file -> environment (highest).
    pub fn load(explicit: Option<&Path>) -> Result<CairnConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = sources::global_file(builder)?;
        let builder = match explicit {
            Some(path) => sources::explicit_file(builder, path)?,
            None => builder,
        };
        let builder = sources::environment(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load config from a specific file with environment overlay, ignoring the global file.
    pub fn load_from_file(path: &Path) -> Result<CairnConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = sources::explicit_file(builder, path)?;
        let builder = sources::environment(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }
}
