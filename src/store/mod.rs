//! Content Store
//!
//! Hash-addressed blob directory. The blob for hash `h` lives at
//! `<root>/h[0:2]/h[2:4]/h`; at most one blob exists per hash.

pub mod writer;

pub use writer::{MaterializeReport, StoreWriter};

use crate::types::ContentHash;
use std::path::{Path, PathBuf};

/// Sharded, hash-addressed blob directory
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the blob for `hash`
    pub fn shard_dir(&self, hash: &ContentHash) -> PathBuf {
        self.root.join(hash.shard_outer()).join(hash.shard_inner())
    }

    /// Full path of the blob for `hash`
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.shard_dir(hash).join(hash.as_str())
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.blob_path(hash).is_file()
    }
}
