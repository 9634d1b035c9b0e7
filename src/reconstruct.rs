//! Tree Reconstructor
//!
//! Rebuilds a view of the original tree as symlinks into the content store.
//! Reconstruction is additive: an existing entry at a destination path is left
//! alone, nothing is ever overwritten or deleted.

pub mod rules;

pub use rules::{PathFilter, Translation, Translations};

use crate::error::ApiError;
use crate::index::Index;
use crate::store::ContentStore;
use crate::types::ContentHash;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Summary of a reconstruct run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructReport {
    pub records_considered: u64,
    pub filtered_out: u64,
    pub links_created: u64,
    pub dirs_created: u64,
    pub skipped_existing: u64,
    pub errors: u64,
}

/// Builds symlink trees from indexes
pub struct Reconstructor {
    store: ContentStore,
    dest_root: PathBuf,
    filter: PathFilter,
    translations: Translations,
}

impl Reconstructor {
    pub fn new(store: ContentStore, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            dest_root: dest_root.into(),
            filter: PathFilter::default(),
            translations: Translations::default(),
        }
    }

    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_translations(mut self, translations: Translations) -> Self {
        self.translations = translations;
        self
    }

    /// Surviving `(hash, translated path)` pairs in index order
    pub fn plan(&self, index: &Index, report: &mut ReconstructReport) -> Vec<(ContentHash, String)> {
        let mut pairs = Vec::new();
        for record in index {
            report.records_considered += 1;
            if !self.filter.accepts(&record.path) {
                report.filtered_out += 1;
                continue;
            }
            pairs.push((record.content_hash.clone(), self.translations.apply(&record.path)));
        }
        pairs
    }

    /// Create the symlink tree for every record of `index`
    pub fn reconstruct(&self, index: &Index) -> ReconstructReport {
        let mut report = ReconstructReport::default();
        for (hash, path) in self.plan(index, &mut report) {
            if let Err(e) = self.link(&hash, &path, &mut report) {
                warn!(hash = %hash, path = %path, error = %e, "Cannot create link");
                report.errors += 1;
            }
        }
        info!(
            links_created = report.links_created,
            skipped_existing = report.skipped_existing,
            filtered_out = report.filtered_out,
            errors = report.errors,
            "Reconstruction finished"
        );
        report
    }

    /// Destination of a translated path; absolute paths are rooted at `dest_root`
    pub fn destination(&self, translated: &str) -> PathBuf {
        let mut dst = self.dest_root.clone();
        for component in Path::new(translated).components() {
            match component {
                Component::Normal(part) => dst.push(part),
                Component::ParentDir => {
                    dst.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        dst
    }

    fn link(&self, hash: &ContentHash, path: &str, report: &mut ReconstructReport) -> io::Result<()> {
        let dst = self.destination(path);
        if !dst.starts_with(&self.dest_root) || dst == self.dest_root {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "translated path escapes the destination root",
            ));
        }
        if fs::symlink_metadata(&dst).is_ok() {
            debug!(path = %dst.display(), "Exists, skipping");
            report.skipped_existing += 1;
            return Ok(());
        }
        if let Some(parent) = dst.parent() {
            if !parent.is_dir() {
                debug!(dir = %parent.display(), "Create dir");
                fs::create_dir_all(parent)?;
                report.dirs_created += 1;
            }
        }
        let src = self.store.blob_path(hash);
        debug!(link = %dst.display(), target = %src.display(), "Create symlink");
        symlink(&src, &dst)?;
        report.links_created += 1;
        Ok(())
    }
}

#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Load `index_files` and reconstruct them under `dest_root`
pub fn reconstruct<P: AsRef<Path>>(
    index_files: &[P],
    source_store: &Path,
    dest_root: &Path,
    filter: PathFilter,
    translations: Translations,
) -> Result<ReconstructReport, ApiError> {
    let index = Index::load_many(index_files)?;
    let reconstructor = Reconstructor::new(ContentStore::new(source_store), dest_root)
        .with_filter(filter)
        .with_translations(translations);
    Ok(reconstructor.reconstruct(&index))
}
