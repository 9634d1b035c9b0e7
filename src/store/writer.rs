//! Content Store Writer
//!
//! Copies each distinct content hash named by one or more indexes into the store
//! exactly once. A source path is only trusted while its live `(mtime, size)` still
//! matches what the indexer recorded; content is not re-hashed on copy.

use crate::error::ApiError;
use crate::index::Index;
use crate::index::update::stamp;
use crate::store::ContentStore;
use crate::types::ContentHash;
use chrono::{DateTime, Local};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const PARTIAL_SUFFIX: &str = ".partial";

/// A recorded location of some content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub mtime: i64,
    pub size: u64,
}

/// Group records by content hash, hashes in order of first appearance.
///
/// Candidates for each hash are sorted by descending mtime; equal mtimes keep
/// index order.
pub fn group_by_hash(index: &Index) -> Vec<(ContentHash, Vec<Candidate>)> {
    let mut slots: HashMap<&ContentHash, usize> = HashMap::new();
    let mut groups: Vec<(ContentHash, Vec<Candidate>)> = Vec::new();
    for record in index {
        let slot = *slots.entry(&record.content_hash).or_insert_with(|| {
            groups.push((record.content_hash.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(Candidate {
            path: record.path.clone(),
            mtime: record.mtime,
            size: record.size,
        });
    }
    for (_, candidates) in &mut groups {
        candidates.sort_by(|a, b| b.mtime.cmp(&a.mtime));
    }
    groups
}

/// What happened to one hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOutcome {
    Copied { from: String, bytes: u64 },
    AlreadyStored,
    Unresolved,
}

/// Summary of a materialize run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializeReport {
    pub hashes: u64,
    pub copied: u64,
    pub already_stored: u64,
    pub bytes_copied: u64,
    pub unresolved: Vec<ContentHash>,
}

impl MaterializeReport {
    fn record(&mut self, hash: &ContentHash, outcome: &BlobOutcome) {
        self.hashes += 1;
        match outcome {
            BlobOutcome::Copied { bytes, .. } => {
                self.copied += 1;
                self.bytes_copied += bytes;
            }
            BlobOutcome::AlreadyStored => self.already_stored += 1,
            BlobOutcome::Unresolved => self.unresolved.push(hash.clone()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Populates a [`ContentStore`] from indexes
pub struct StoreWriter {
    store: ContentStore,
}

impl StoreWriter {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Copy every resolvable hash of `index` into the store
    pub fn materialize(&self, index: &Index) -> Result<MaterializeReport, ApiError> {
        fs::create_dir_all(self.store.root()).map_err(|e| {
            ApiError::ConfigError(format!(
                "Failed to create store root {}: {}",
                self.store.root().display(),
                e
            ))
        })?;

        let mut report = MaterializeReport::default();
        for (hash, candidates) in group_by_hash(index) {
            let outcome = self.materialize_hash(&hash, &candidates);
            report.record(&hash, &outcome);
        }

        info!(
            hashes = report.hashes,
            copied = report.copied,
            already_stored = report.already_stored,
            unresolved = report.unresolved.len(),
            "Store update finished"
        );
        Ok(report)
    }

    /// Store one hash from the first candidate whose live stat still matches
    pub fn materialize_hash(&self, hash: &ContentHash, candidates: &[Candidate]) -> BlobOutcome {
        let dst = self.store.blob_path(hash);
        if dst.is_file() {
            debug!(hash = %hash, "Exists");
            return BlobOutcome::AlreadyStored;
        }

        for candidate in candidates {
            if !live_stat_matches(candidate) {
                debug!(hash = %hash, path = %candidate.path, "Source changed or missing");
                continue;
            }
            match self.copy_in(hash, candidate, &dst) {
                Ok(bytes) => {
                    debug!(hash = %hash, path = %candidate.path, bytes, "Copied");
                    return BlobOutcome::Copied {
                        from: candidate.path.clone(),
                        bytes,
                    };
                }
                Err(e) => {
                    warn!(hash = %hash, path = %candidate.path, error = %e, "Copy failed");
                }
            }
        }

        error!(hash = %hash, candidates = candidates.len(), "Content not found");
        BlobOutcome::Unresolved
    }

    fn copy_in(&self, hash: &ContentHash, candidate: &Candidate, dst: &Path) -> io::Result<u64> {
        fs::create_dir_all(self.store.shard_dir(hash))?;
        let partial = partial_path(dst);
        let result = write_partial(candidate, &partial).and_then(|bytes| {
            fs::rename(&partial, dst)?;
            Ok(bytes)
        });
        if result.is_err() {
            let _ = fs::remove_file(&partial);
        }
        result
    }

    /// Copy an index file into the store root as `<source>.<name>.bak-<stamp>`
    pub fn archive_index(
        &self,
        index_file: &Path,
        source: &str,
        at: DateTime<Local>,
    ) -> Result<PathBuf, ApiError> {
        let name = index_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file_index".to_string());
        let dst = self
            .store
            .root()
            .join(format!("{}.{}.bak-{}", source, name, stamp(at)));
        fs::copy(index_file, &dst)?;
        info!(index = %index_file.display(), to = %dst.display(), "Archived index");
        Ok(dst)
    }
}

// Copy the candidate into `partial`; the byte count must match the recorded size.
fn write_partial(candidate: &Candidate, partial: &Path) -> io::Result<u64> {
    let mut src = File::open(&candidate.path)?;
    let mut out = File::create(partial)?;
    let bytes = io::copy(&mut src, &mut out)?;
    out.sync_all()?;
    if bytes != candidate.size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "source changed during copy ({} bytes, expected {})",
                bytes, candidate.size
            ),
        ));
    }
    Ok(bytes)
}

fn partial_path(dst: &Path) -> PathBuf {
    let mut name = dst.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn live_stat_matches(candidate: &Candidate) -> bool {
    match fs::metadata(&candidate.path) {
        Ok(meta) => {
            meta.is_file()
                && meta.len() == candidate.size
                && FileTime::from_last_modification_time(&meta).unix_seconds() == candidate.mtime
        }
        Err(_) => false,
    }
}

/// Load `index_files` and materialize them into the store at `store_root`
pub fn materialize<P: AsRef<Path>>(
    index_files: &[P],
    store_root: &Path,
) -> Result<MaterializeReport, ApiError> {
    let index = Index::load_many(index_files)?;
    StoreWriter::new(ContentStore::new(store_root)).materialize(&index)
}
