//! Index Files
//!
//! An index is an ordered sequence of [`IndexRecord`]s, one per line of a text file
//! (`content_hash,mtime,size,original_path`). Records are append-only: the indexer
//! extends an index, every other component only reads it.

pub mod fingerprint;
pub mod record;
pub mod update;

pub use fingerprint::{fingerprint, FingerprintSet};
pub use record::IndexRecord;
pub use update::{CommitOutcome, IndexUpdate};

use crate::error::StorageError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// In-memory copy of one or more index files, in file order
#[derive(Debug, Clone, Default)]
pub struct Index {
    records: Vec<IndexRecord>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single index file
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let mut index = Index::new();
        index.extend_from_file(path)?;
        Ok(index)
    }

    /// Load several index files, concatenating their records in argument order
    pub fn load_many<P: AsRef<Path>>(paths: &[P]) -> Result<Self, StorageError> {
        let mut index = Index::new();
        for path in paths {
            index.extend_from_file(path.as_ref())?;
        }
        Ok(index)
    }

    /// Load an index if it exists; a missing file is an empty index (first run)
    pub fn load_if_exists(path: &Path) -> Result<Option<Self>, StorageError> {
        match File::open(path) {
            Ok(file) => {
                let mut index = Index::new();
                index.extend_from_reader(file, path)?;
                Ok(Some(index))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn extend_from_file(&mut self, path: &Path) -> Result<(), StorageError> {
        let file = File::open(path)?;
        self.extend_from_reader(file, path)
    }

    /// Parse records from any reader; `origin` only labels errors
    pub fn extend_from_reader<R: Read>(
        &mut self,
        reader: R,
        origin: &Path,
    ) -> Result<(), StorageError> {
        let mut csv_reader = record::reader_builder().from_reader(reader);
        for row in csv_reader.deserialize::<IndexRecord>() {
            let record = row.map_err(|source| StorageError::Csv {
                path: origin.to_path_buf(),
                source,
            })?;
            self.records.push(record);
        }
        Ok(())
    }

    pub fn push(&mut self, record: IndexRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntoIterator for Index {
    type Item = IndexRecord;
    type IntoIter = std::vec::IntoIter<IndexRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Index {
    type Item = &'a IndexRecord;
    type IntoIter = std::slice::Iter<'a, IndexRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
