//! Atomic index replacement.
//!
//! New records go to `<index>.tmp-<stamp>`, seeded with the previous index content.
//! On commit the previous index is renamed to `<index>.bak-<stamp>` and the
//! temporary file takes the canonical name. The canonical file is never written in
//! place, so an interrupted run leaves it intact.

use crate::error::StorageError;
use crate::index::record::RecordWriter;
use crate::index::IndexRecord;
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Format the suffix used for temporary and backup index names
pub fn stamp(at: DateTime<Local>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

fn sibling(index_path: &Path, kind: &str, stamp: &str) -> PathBuf {
    let mut name = index_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}-{}", kind, stamp));
    index_path.with_file_name(name)
}

/// Result of a committed update
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub index_path: PathBuf,
    /// Where the previous index was moved, if there was one
    pub backup_path: Option<PathBuf>,
}

/// An in-progress index update
pub struct IndexUpdate {
    index_path: PathBuf,
    temp_path: PathBuf,
    backup_path: PathBuf,
    writer: RecordWriter<BufWriter<File>>,
}

impl IndexUpdate {
    /// Start an update of `index_path`, stamped with `started`
    pub fn begin(index_path: &Path, started: DateTime<Local>) -> Result<Self, StorageError> {
        let stamp = stamp(started);
        let temp_path = sibling(index_path, "tmp", &stamp);
        let backup_path = sibling(index_path, "bak", &stamp);

        match fs::copy(index_path, &temp_path) {
            Ok(bytes) => debug!(from = %index_path.display(), to = %temp_path.display(), bytes, "Seeded temporary index"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                File::create(&temp_path)?;
            }
            Err(e) => return Err(e.into()),
        }
        ensure_trailing_newline(&temp_path)?;

        let file = OpenOptions::new().append(true).open(&temp_path)?;
        Ok(Self {
            index_path: index_path.to_path_buf(),
            temp_path,
            backup_path,
            writer: RecordWriter::new(BufWriter::new(file)),
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn append(&mut self, record: &IndexRecord) -> Result<(), StorageError> {
        self.writer.append(record)
    }

    /// Flush, back up the previous index and move the new one into place
    pub fn commit(self) -> Result<CommitOutcome, StorageError> {
        let buffered = self.writer.into_inner()?;
        let file = buffered
            .into_inner()
            .map_err(|e| StorageError::IoError(std::io::Error::new(e.error().kind(), e.error().to_string())))?;
        file.sync_all()?;
        drop(file);

        let backup_path = match fs::rename(&self.index_path, &self.backup_path) {
            Ok(()) => Some(self.backup_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        fs::rename(&self.temp_path, &self.index_path)?;

        Ok(CommitOutcome {
            index_path: self.index_path,
            backup_path,
        })
    }
}

// A hand-edited index may lack the final newline; appending would then glue two records.
fn ensure_trailing_newline(path: &Path) -> Result<(), StorageError> {
    let content = fs::read(path)?;
    if let Some(&last) = content.last() {
        if last != b'\n' {
            let mut file = OpenOptions::new().append(true).open(path)?;
            file.write_all(b"\n")?;
        }
    }
    Ok(())
}
