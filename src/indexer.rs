//! Indexer
//!
//! Walks directory trees and records every file version not already present in the
//! index. Unchanged files (same path, mtime and size) are recognised through the
//! [`FingerprintSet`] and never re-read; everything else is hashed and appended.
//! Per-entry failures are counted and skipped, the walk always completes.

pub mod hasher;

use crate::error::{ApiError, StorageError};
use crate::index::{CommitOutcome, FingerprintSet, Index, IndexRecord, IndexUpdate};
use chrono::{Duration, Local};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Indexer options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Descend into symlinked directories and index symlinked files
    #[serde(default)]
    pub follow_symlinks: bool,
}

/// Counters for one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub dirs_scanned: u64,
    pub dirs_errored: u64,
    pub files_scanned: u64,
    pub files_skipped: u64,
    pub files_hashed: u64,
    pub files_errored: u64,
    pub bytes_hashed: u64,
}

/// Summary of a committed indexing run
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub stats: IndexStats,
    pub records_loaded: usize,
    pub records_added: usize,
    pub commit: CommitOutcome,
}

/// Directory walker backed by a fingerprint set
pub struct Indexer {
    config: IndexerConfig,
    fingerprints: FingerprintSet,
    stats: IndexStats,
}

impl Indexer {
    pub fn new(config: IndexerConfig, fingerprints: FingerprintSet) -> Self {
        Self {
            config,
            fingerprints,
            stats: IndexStats::default(),
        }
    }

    /// Indexer seeded from an existing index
    pub fn from_index(config: IndexerConfig, index: &Index) -> Self {
        Self::new(config, FingerprintSet::from_index(index))
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    pub fn fingerprints(&self) -> &FingerprintSet {
        &self.fingerprints
    }

    /// Walk `root`, passing each new record to `sink`.
    ///
    /// Only a failing sink aborts the walk.
    pub fn scan<F>(&mut self, root: &Path, mut sink: F) -> Result<(), StorageError>
    where
        F: FnMut(IndexRecord) -> Result<(), StorageError>,
    {
        let root = match root.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %root.display(), error = %e, "Cannot resolve directory, skipping");
                self.stats.dirs_errored += 1;
                return Ok(());
            }
        };

        let walker = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.record_walk_error(&e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                debug!(path = %entry.path().display(), "Scanning directory");
                self.stats.dirs_scanned += 1;
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            if let Some(record) = self.visit_file(entry.path()) {
                sink(record)?;
            }
        }
        Ok(())
    }

    /// Walk several roots and collect the new records
    pub fn collect<P: AsRef<Path>>(&mut self, roots: &[P]) -> Vec<IndexRecord> {
        let mut records = Vec::new();
        for root in roots {
            let result = self.scan(root.as_ref(), |record| {
                records.push(record);
                Ok(())
            });
            // the collecting sink cannot fail
            debug_assert!(result.is_ok());
        }
        records
    }

    fn visit_file(&mut self, path: &Path) -> Option<IndexRecord> {
        self.stats.files_scanned += 1;

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot stat file");
                self.stats.files_errored += 1;
                return None;
            }
        };
        let Some(path_str) = path.to_str() else {
            warn!(path = %path.display(), "Path is not valid UTF-8, skipping");
            self.stats.files_errored += 1;
            return None;
        };
        let mtime = FileTime::from_last_modification_time(&metadata).unix_seconds();
        let size = metadata.len();

        if self.fingerprints.contains(path_str, mtime, size) {
            debug!(path = path_str, mtime, size, "Unchanged, skipping");
            self.stats.files_skipped += 1;
            return None;
        }

        debug!(path = path_str, mtime, size, "Hashing");
        match hasher::hash_file(path) {
            Ok((content_hash, bytes)) => {
                self.stats.files_hashed += 1;
                self.stats.bytes_hashed += bytes;
                self.fingerprints.insert(path_str, mtime, size);
                Some(IndexRecord::new(content_hash, mtime, size, path_str))
            }
            Err(e) => {
                warn!(path = path_str, error = %e, "Cannot hash file, skipping");
                self.stats.files_errored += 1;
                None
            }
        }
    }

    fn record_walk_error(&mut self, err: &walkdir::Error) {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        let is_dir = err.loop_ancestor().is_some()
            || err.depth() == 0
            || std::fs::symlink_metadata(&path)
                .map(|m| m.is_dir())
                .unwrap_or(false);
        warn!(path = %path.display(), error = %err, "Walk error");
        if is_dir {
            self.stats.dirs_errored += 1;
        } else {
            self.stats.files_errored += 1;
        }
    }
}

/// Index `dirs` into `index_path`, extending any existing index.
///
/// The previous index is kept as a timestamped backup; the canonical file is only
/// replaced once the new one is complete.
pub fn index_directories<P: AsRef<Path>>(
    dirs: &[P],
    index_path: &Path,
    config: IndexerConfig,
) -> Result<IndexReport, ApiError> {
    let started = Local::now() - Duration::seconds(1);

    let existing = Index::load_if_exists(index_path)?;
    let records_loaded = existing.as_ref().map(Index::len).unwrap_or(0);
    match &existing {
        Some(_) => info!(index = %index_path.display(), records = records_loaded, "Loaded existing index"),
        None => info!(index = %index_path.display(), "No existing index, first run"),
    }
    let mut indexer = Indexer::from_index(config, &existing.unwrap_or_default());

    let mut update = IndexUpdate::begin(index_path, started)?;
    let mut records_added = 0usize;
    for dir in dirs {
        indexer.scan(dir.as_ref(), |record| {
            records_added += 1;
            update.append(&record)
        })?;
    }
    let commit = update.commit()?;

    let stats = indexer.stats().clone();
    info!(
        dirs_scanned = stats.dirs_scanned,
        dirs_errored = stats.dirs_errored,
        files_scanned = stats.files_scanned,
        files_hashed = stats.files_hashed,
        files_errored = stats.files_errored,
        bytes_hashed = stats.bytes_hashed,
        "Indexing finished"
    );

    Ok(IndexReport {
        stats,
        records_loaded,
        records_added,
        commit,
    })
}

/// Default index file name
pub fn default_index_path() -> PathBuf {
    PathBuf::from("file_index")
}
