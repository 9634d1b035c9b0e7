//! Open file handle table.
//!
//! Maps opaque handle ids to open content-store blobs. The map itself is guarded
//! by a lock; each handle is used by one request at a time, so the blob itself is
//! not locked.

use crate::error::FsError;
use crate::types::{HandleId, Inode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An open content-store blob
#[derive(Debug)]
pub struct OpenBlob {
    pub inode: Inode,
    pub file: File,
}

/// Handle id -> open blob
#[derive(Debug)]
pub struct HandleTable {
    next: AtomicU64,
    open: RwLock<HashMap<HandleId, Arc<OpenBlob>>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            open: RwLock::new(HashMap::new()),
        }
    }

    /// Register an open blob and return its handle
    pub fn insert(&self, inode: Inode, file: File) -> HandleId {
        let fh = self.next.fetch_add(1, Ordering::Relaxed);
        self.open.write().insert(fh, Arc::new(OpenBlob { inode, file }));
        fh
    }

    pub fn get(&self, fh: HandleId) -> Result<Arc<OpenBlob>, FsError> {
        self.open.read().get(&fh).cloned().ok_or(FsError::BadHandle(fh))
    }

    /// Drop a handle; the blob closes once no in-flight read holds it
    pub fn release(&self, fh: HandleId) -> Result<(), FsError> {
        self.open
            .write()
            .remove(&fh)
            .map(|_| ())
            .ok_or(FsError::BadHandle(fh))
    }

    /// Drop every handle, returning how many were open
    pub fn release_all(&self) -> usize {
        let mut open = self.open.write();
        let count = open.len();
        open.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.open.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.read().is_empty()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
