//! Fingerprint Store
//!
//! Answers "has this exact file version already been recorded?" without touching
//! file content. A fingerprint covers `(path, mtime, size)` only.

use crate::index::{Index, IndexRecord};
use crate::types::Fingerprint;
use std::collections::HashSet;

/// Compute the fingerprint of a file version
pub fn fingerprint(path: &str, mtime: i64, size: u64) -> Fingerprint {
    let key = format!("{}:{}:{}", path, mtime, size);
    *blake3::hash(key.as_bytes()).as_bytes()
}

/// Set of fingerprints loaded from an index
#[derive(Debug, Default)]
pub struct FingerprintSet {
    seen: HashSet<Fingerprint>,
}

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: &Index) -> Self {
        let mut set = Self::new();
        for record in index {
            set.insert_record(record);
        }
        set
    }

    pub fn insert_record(&mut self, record: &IndexRecord) -> bool {
        self.insert(&record.path, record.mtime, record.size)
    }

    pub fn insert(&mut self, path: &str, mtime: i64, size: u64) -> bool {
        self.seen.insert(fingerprint(path, mtime, size))
    }

    pub fn contains(&self, path: &str, mtime: i64, size: u64) -> bool {
        self.seen.contains(&fingerprint(path, mtime, size))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
