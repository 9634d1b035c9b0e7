//! Configuration
//!
//! Layered settings for the archive commands. Precedence, lowest to highest:
//! built-in defaults, `$XDG_CONFIG_HOME/cairn/config.toml`, an explicit
//! `--config` file, then `CAIRN__*` environment variables. Command-line flags
//! override the result.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CairnConfig {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub mount: MountConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("file_index")
}

/// Indexer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index file created or updated by `cairn index`
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    /// Follow symbolic links while walking
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            follow_symlinks: false,
        }
    }
}

/// Content store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default store root for `copy`, `reconstruct` and `mount`
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl StoreConfig {
    /// Pick the CLI value, falling back to the configured root
    pub fn resolve_root(&self, cli: Option<PathBuf>) -> Result<PathBuf, crate::error::ApiError> {
        cli.or_else(|| self.root.clone()).ok_or_else(|| {
            crate::error::ApiError::ConfigError(
                "No content store given (use --store or set store.root)".to_string(),
            )
        })
    }
}

fn default_fs_name() -> String {
    "cairn".to_string()
}

fn default_ttl_secs() -> u64 {
    1
}

/// Virtual filesystem mount settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    #[serde(default = "default_fs_name")]
    pub fs_name: String,

    /// Owner reported for every node; defaults to the mounting user
    #[serde(default)]
    pub uid: Option<u32>,

    #[serde(default)]
    pub gid: Option<u32>,

    /// Kernel attribute cache lifetime
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            fs_name: default_fs_name(),
            uid: None,
            gid: None,
            ttl_secs: default_ttl_secs(),
        }
    }
}
