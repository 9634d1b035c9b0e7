//! Index record representation and the on-disk line format.

use crate::error::StorageError;
use crate::types::ContentHash;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One logical file version: `content_hash,mtime,size,original_path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub content_hash: ContentHash,
    /// Modification time, whole seconds since the epoch
    pub mtime: i64,
    pub size: u64,
    /// Absolute path at indexing time
    pub path: String,
}

impl IndexRecord {
    pub fn new(content_hash: ContentHash, mtime: i64, size: u64, path: impl Into<String>) -> Self {
        Self {
            content_hash,
            mtime,
            size,
            path: path.into(),
        }
    }
}

pub(crate) fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(false);
    builder
}

pub(crate) fn writer_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.has_headers(false);
    builder
}

/// Appends records to an index stream
pub struct RecordWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: writer_builder().from_writer(writer),
        }
    }

    pub fn append(&mut self, record: &IndexRecord) -> Result<(), StorageError> {
        self.inner.serialize(record).map_err(csv_to_storage)
    }

    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W, StorageError> {
        self.inner
            .into_inner()
            .map_err(|e| {
                StorageError::IoError(std::io::Error::new(e.error().kind(), e.error().to_string()))
            })
    }
}

fn csv_to_storage(err: csv::Error) -> StorageError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.into_kind() {
        csv::ErrorKind::Io(io) => StorageError::IoError(io),
        other => StorageError::InvalidRecord {
            line,
            reason: format!("{:?}", other),
        },
    }
}
