//! Virtual Filesystem
//!
//! Serves a read-only view of an index straight from the content store. Metadata
//! comes from the in-memory [`VirtualTree`]; file bytes are read from the shard
//! blob on demand through an open handle. Every operation takes `&self`: the tree
//! is immutable after load and the handle table carries its own lock.

pub mod attr;
#[cfg(feature = "fuse")]
pub mod fuse;
pub mod handles;
pub mod node;

pub use attr::{FileAttributes, FileKind};
pub use handles::HandleTable;
pub use node::{LoadStats, Node, NodeKind, VirtualTree, ROOT_INODE};

use crate::error::{FsError, StorageError};
use crate::index::Index;
use crate::store::ContentStore;
use crate::types::{HandleId, Inode};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

/// Requested access of an open call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    /// Decode the access bits of `open(2)` flags
    pub fn from_flags(flags: i32) -> Self {
        match flags & libc::O_ACCMODE {
            libc::O_WRONLY => AccessMode::WriteOnly,
            libc::O_RDWR => AccessMode::ReadWrite,
            _ => AccessMode::ReadOnly,
        }
    }

    pub fn wants_write(self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }
}

/// Ownership reported for every node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VfsOptions {
    pub uid: u32,
    pub gid: u32,
}

impl VfsOptions {
    /// Report every node as owned by the calling process's user and group
    #[cfg(unix)]
    pub fn current_user() -> Self {
        Self {
            uid: rustix::process::getuid().as_raw(),
            gid: rustix::process::getgid().as_raw(),
        }
    }
}

/// A mounted (or mountable) archive view
#[derive(Debug)]
pub struct ArchiveFs {
    tree: VirtualTree,
    store: ContentStore,
    options: VfsOptions,
    handles: HandleTable,
}

impl ArchiveFs {
    pub fn new(tree: VirtualTree, store: ContentStore, options: VfsOptions) -> Self {
        Self {
            tree,
            store,
            options,
            handles: HandleTable::new(),
        }
    }

    /// Build the tree from `index`
    pub fn load(index: &Index, store: ContentStore, options: VfsOptions) -> Self {
        Self::new(VirtualTree::from_index(index), store, options)
    }

    /// Read `index_file` and serve it from the store at `store_root`
    pub fn open(
        index_file: &Path,
        store_root: &Path,
        options: VfsOptions,
    ) -> Result<Self, StorageError> {
        let index = Index::load(index_file)?;
        let fs = Self::load(&index, ContentStore::new(store_root), options);
        let stats = fs.tree.stats();
        info!(
            index = %index_file.display(),
            records = stats.records,
            files = stats.files,
            directories = stats.directories,
            conflicts = stats.conflicts,
            "Index loaded"
        );
        Ok(fs)
    }

    pub fn tree(&self) -> &VirtualTree {
        &self.tree
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Attributes of `inode`; unknown inodes yield the sentinel
    pub fn attributes(&self, inode: Inode) -> FileAttributes {
        debug!(inode, "getattr");
        self.try_attributes(inode).unwrap_or_default()
    }

    /// Attributes of `inode`, "not found" for unknown inodes
    pub fn try_attributes(&self, inode: Inode) -> Result<FileAttributes, FsError> {
        self.tree
            .get(inode)
            .map(|node| FileAttributes::for_node(node, self.options.uid, self.options.gid))
            .ok_or(FsError::NotFound)
    }

    /// Find `name` in directory `parent`.
    ///
    /// A miss is the sentinel (inode 0), not an error; an unknown or non-directory
    /// parent is "not found".
    pub fn lookup(&self, parent: Inode, name: &str) -> Result<FileAttributes, FsError> {
        debug!(parent, name, "lookup");
        let dir = self.directory(parent)?;
        match self.tree.child_by_name(dir.inode, name) {
            Some(child) => Ok(FileAttributes::for_node(
                child,
                self.options.uid,
                self.options.gid,
            )),
            None => Ok(FileAttributes::sentinel()),
        }
    }

    /// Directory handles are the directory inode
    pub fn open_directory(&self, inode: Inode) -> Result<HandleId, FsError> {
        debug!(inode, "opendir");
        self.directory(inode).map(|node| node.inode)
    }

    /// List children from `start_offset`.
    ///
    /// `emit(name, attributes, next_offset)` returns `false` when the reply buffer
    /// is full; listing stops there and resumes from that entry's offset.
    pub fn read_directory<F>(
        &self,
        inode: Inode,
        start_offset: u64,
        mut emit: F,
    ) -> Result<(), FsError>
    where
        F: FnMut(&str, &FileAttributes, u64) -> bool,
    {
        debug!(inode, start_offset, "readdir");
        let children = self.directory(inode)?.children().unwrap_or_default();
        let start = usize::try_from(start_offset).unwrap_or(usize::MAX);
        for (idx, &child) in children.iter().enumerate().skip(start) {
            let Some(node) = self.tree.get(child) else {
                continue;
            };
            let attr = FileAttributes::for_node(node, self.options.uid, self.options.gid);
            if !emit(&node.name, &attr, idx as u64 + 1) {
                break;
            }
        }
        Ok(())
    }

    /// Open a file node's blob for reading
    pub fn open_file(&self, inode: Inode, mode: AccessMode) -> Result<HandleId, FsError> {
        debug!(inode, ?mode, "open");
        if mode.wants_write() {
            return Err(FsError::AccessDenied);
        }
        let data = self
            .tree
            .get(inode)
            .and_then(Node::file)
            .ok_or(FsError::NotFound)?;
        let blob = self.store.blob_path(&data.content_hash);
        debug!(inode, blob = %blob.display(), "Opening blob");
        let file = File::open(&blob)?;
        Ok(self.handles.insert(inode, file))
    }

    /// Read up to `length` bytes at `offset`; short at end of file
    pub fn read(&self, fh: HandleId, offset: u64, length: usize) -> Result<Vec<u8>, FsError> {
        debug!(fh, offset, length, "read");
        let blob = self.handles.get(fh)?;
        let mut file = &blob.file;
        file.seek(SeekFrom::Start(offset))?;
        // grows with what is actually read; `length` is only an upper bound
        let mut buf = Vec::new();
        file.take(u64::try_from(length).unwrap_or(u64::MAX))
            .read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Close a handle; unknown or already released handles are an error
    pub fn release(&self, fh: HandleId) -> Result<(), FsError> {
        debug!(fh, "release");
        self.handles.release(fh)
    }

    /// Close every open handle, e.g. on unmount
    pub fn release_all(&self) -> usize {
        let count = self.handles.release_all();
        if count > 0 {
            info!(count, "Closed open handles");
        }
        count
    }

    fn directory(&self, inode: Inode) -> Result<&Node, FsError> {
        match self.tree.get(inode) {
            Some(node) if node.is_dir() => Ok(node),
            _ => Err(FsError::NotFound),
        }
    }
}

impl Drop for ArchiveFs {
    fn drop(&mut self) {
        self.release_all();
    }
}
