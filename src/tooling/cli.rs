//! CLI Tooling
//!
//! Command-line interface for the archive jobs and the virtual filesystem. Each
//! command returns its rendered output; the binary prints it.

use crate::config::{CairnConfig, ConfigLoader};
use crate::error::{ApiError, StorageError};
use crate::indexer::{index_directories, IndexReport, IndexerConfig};
use crate::reconstruct::{reconstruct, PathFilter, Translations};
use crate::store::writer::materialize;
use crate::store::{ContentStore, MaterializeReport, StoreWriter};
use crate::tooling::format::{
    format_index_report, format_listing, format_materialize_report, format_reconstruct_report,
};
use crate::vfs::{ArchiveFs, FileAttributes, VfsOptions};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Cairn CLI - content-addressed file archive
#[derive(Parser)]
#[command(name = "cairn")]
#[command(about = "Index, deduplicate, restore and mount file archives by content hash")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan directories and extend the index with new or changed files
    Index {
        /// Directories to scan
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
        /// Index file to create or update
        #[arg(short, long)]
        index: Option<PathBuf>,
        /// Follow symbolic links while walking
        #[arg(long)]
        follow_symlinks: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Copy the files named by one or more indexes into the content store
    Copy {
        /// Index files to read
        #[arg(required = true)]
        indexes: Vec<PathBuf>,
        /// Content store root
        #[arg(short, long, alias = "store")]
        out: Option<PathBuf>,
        /// Archive each index into the store under this source name
        #[arg(short, long)]
        source: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Recreate indexed paths as symlinks into the content store
    Reconstruct {
        /// Index files to read
        #[arg(required = true)]
        indexes: Vec<PathBuf>,
        /// Content store the links point into
        #[arg(short, long, alias = "store")]
        source: Option<PathBuf>,
        /// Destination root
        #[arg(short, long)]
        root: PathBuf,
        /// Glob pattern a path must match (repeatable; any match accepts)
        #[arg(short, long)]
        filter: Vec<String>,
        /// Regex translation applied to each path, in order (repeatable)
        #[arg(
            short,
            long,
            num_args = 2,
            value_names = ["PATTERN", "REPLACEMENT"],
            action = clap::ArgAction::Append
        )]
        translate: Vec<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Mount an index read-only, serving contents from the store
    Mount {
        /// Index file to serve
        index: PathBuf,
        /// Mount point
        mountpoint: PathBuf,
        /// Content store root
        #[arg(short, long)]
        store: Option<PathBuf>,
        /// Owner uid reported for every node
        #[arg(long)]
        uid: Option<u32>,
        /// Owner gid reported for every node
        #[arg(long)]
        gid: Option<u32>,
        /// Filesystem name shown in the mount table
        #[arg(long)]
        fs_name: Option<String>,
        /// Enable FUSE debug output
        #[arg(long)]
        debug_fuse: bool,
    },
    /// List a directory of the virtual tree without mounting
    Ls {
        /// Index file to load
        index: PathBuf,
        /// Directory inside the tree
        #[arg(default_value = "/")]
        path: String,
        /// Content store root
        #[arg(short, long)]
        store: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Execution context for CLI commands
pub struct CliContext {
    config: CairnConfig,
}

#[derive(Serialize)]
struct ListingEntry<'a> {
    name: &'a str,
    inode: u64,
    directory: bool,
    size: u64,
    mtime: i64,
}

impl CliContext {
    /// Load layered configuration, with `config_path` as the explicit file
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: CairnConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CairnConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Index {
                dirs,
                index,
                follow_symlinks,
                format,
            } => {
                let index_path = index.clone().unwrap_or_else(|| self.config.index.path.clone());
                let config = IndexerConfig {
                    follow_symlinks: *follow_symlinks || self.config.index.follow_symlinks,
                };
                let report = index_directories(dirs, &index_path, config)?;
                render(format, &index_report_json(&report), || {
                    format_index_report(&report)
                })
            }
            Commands::Copy {
                indexes,
                out,
                source,
                format,
            } => {
                let store_root = self.config.store.resolve_root(out.clone())?;
                let report = self.copy(indexes, &store_root, source.as_deref())?;
                render(format, &report, || format_materialize_report(&report))
            }
            Commands::Reconstruct {
                indexes,
                source,
                root,
                filter,
                translate,
                format,
            } => {
                let store_root = self.config.store.resolve_root(source.clone())?;
                let filter = PathFilter::new(filter)?;
                let translations = Translations::from_pairs(&translation_pairs(translate))?;
                info!(indexes = indexes.len(), dest = %root.display(), "Reconstructing");
                let report = reconstruct(indexes, &store_root, root, filter, translations)?;
                render(format, &report, || format_reconstruct_report(&report))
            }
            Commands::Mount {
                index,
                mountpoint,
                store,
                uid,
                gid,
                fs_name,
                debug_fuse,
            } => {
                let store_root = self.config.store.resolve_root(store.clone())?;
                let options = self.vfs_options(*uid, *gid);
                self.mount(
                    index,
                    mountpoint,
                    &store_root,
                    options,
                    fs_name.clone(),
                    *debug_fuse,
                )
            }
            Commands::Ls {
                index,
                path,
                store,
                format,
            } => {
                let store_root = store
                    .clone()
                    .or_else(|| self.config.store.root.clone())
                    .unwrap_or_default();
                let fs = ArchiveFs::open(index, &store_root, self.vfs_options(None, None))?;
                let entries = list_directory(&fs, path)?;
                if format == "json" {
                    let listing: Vec<ListingEntry<'_>> = entries
                        .iter()
                        .map(|(name, attr)| ListingEntry {
                            name,
                            inode: attr.ino,
                            directory: attr.kind == crate::vfs::FileKind::Directory,
                            size: attr.size,
                            mtime: DateTime::<Utc>::from(attr.mtime).timestamp(),
                        })
                        .collect();
                    to_json(&listing)
                } else {
                    Ok(format_listing(path, &entries))
                }
            }
        }
    }

    fn copy(
        &self,
        indexes: &[PathBuf],
        store_root: &Path,
        source: Option<&str>,
    ) -> Result<MaterializeReport, ApiError> {
        let at = Local::now();
        let report = materialize(indexes, store_root)?;
        if let Some(source) = source {
            let writer = StoreWriter::new(ContentStore::new(store_root));
            for index_file in indexes {
                writer.archive_index(index_file, source, at)?;
            }
        }
        Ok(report)
    }

    /// Ownership: explicit flags, then config, then the current user
    fn vfs_options(&self, uid: Option<u32>, gid: Option<u32>) -> VfsOptions {
        let current = current_user();
        VfsOptions {
            uid: uid.or(self.config.mount.uid).unwrap_or(current.uid),
            gid: gid.or(self.config.mount.gid).unwrap_or(current.gid),
        }
    }

    #[cfg(feature = "fuse")]
    fn mount(
        &self,
        index: &Path,
        mountpoint: &Path,
        store_root: &Path,
        options: VfsOptions,
        fs_name: Option<String>,
        debug_fuse: bool,
    ) -> Result<String, ApiError> {
        use crate::vfs::fuse::{mount, MountSettings};
        use std::time::Duration;

        let fs = ArchiveFs::open(index, store_root, options)?;
        let settings = MountSettings {
            fs_name: fs_name.unwrap_or_else(|| self.config.mount.fs_name.clone()),
            ttl: Duration::from_secs(self.config.mount.ttl_secs),
            debug: debug_fuse,
        };
        mount(fs, mountpoint, &settings)?;
        Ok(format!("Unmounted {}", mountpoint.display()))
    }

    #[cfg(not(feature = "fuse"))]
    fn mount(
        &self,
        _index: &Path,
        _mountpoint: &Path,
        _store_root: &Path,
        _options: VfsOptions,
        _fs_name: Option<String>,
        _debug_fuse: bool,
    ) -> Result<String, ApiError> {
        Err(ApiError::Unsupported(
            "mount requires a build with the `fuse` feature".to_string(),
        ))
    }
}

#[cfg(unix)]
fn current_user() -> VfsOptions {
    VfsOptions::current_user()
}

#[cfg(not(unix))]
fn current_user() -> VfsOptions {
    VfsOptions::default()
}

/// Pair up `--translate PATTERN REPLACEMENT` values in order
fn translation_pairs(translate: &[String]) -> Vec<(&str, &str)> {
    translate
        .chunks(2)
        .filter_map(|pair| match pair {
            [pattern, replacement] => Some((pattern.as_str(), replacement.as_str())),
            _ => None,
        })
        .collect()
}

/// Children of the directory at `path`, in listing order
pub fn list_directory(
    fs: &ArchiveFs,
    path: &str,
) -> Result<Vec<(String, FileAttributes)>, ApiError> {
    let dir = fs
        .tree()
        .resolve(path)
        .ok_or_else(|| ApiError::ConfigError(format!("No such directory in index: {}", path)))?;
    let mut entries = Vec::new();
    fs.read_directory(dir.inode, 0, |name, attr, _| {
        entries.push((name.to_string(), attr.clone()));
        true
    })
    .map_err(|_| ApiError::ConfigError(format!("Not a directory: {}", path)))?;
    Ok(entries)
}

fn index_report_json(report: &IndexReport) -> serde_json::Value {
    json!({
        "index": report.commit.index_path,
        "backup": report.commit.backup_path,
        "records_loaded": report.records_loaded,
        "records_added": report.records_added,
        "stats": report.stats,
    })
}

fn render<T, F>(format: &str, value: &T, text: F) -> Result<String, ApiError>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    if format == "json" {
        to_json(value)
    } else {
        Ok(text())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::IoError(e.into())))
}
