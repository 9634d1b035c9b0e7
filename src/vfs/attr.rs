//! Attribute synthesis for virtual nodes.

use crate::types::Inode;
use crate::vfs::node::{Node, NodeKind};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Directories: read and traverse for everyone
pub const DIR_PERM: u16 = 0o555;
/// Files: read-only for everyone
pub const FILE_PERM: u16 = 0o444;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
}

/// Attributes reported for a node. `ino == 0` marks "no such entry".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub ino: Inode,
    pub kind: FileKind,
    pub perm: u16,
    pub size: u64,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: SystemTime,
}

impl Default for FileAttributes {
    fn default() -> Self {
        Self::sentinel()
    }
}

impl FileAttributes {
    /// Negative result: inode zero, nothing else meaningful
    pub fn sentinel() -> Self {
        Self {
            ino: 0,
            kind: FileKind::RegularFile,
            perm: 0,
            size: 0,
            nlink: 0,
            uid: 0,
            gid: 0,
            mtime: UNIX_EPOCH,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.ino == 0
    }

    pub fn for_node(node: &Node, uid: u32, gid: u32) -> Self {
        match &node.kind {
            NodeKind::Directory { .. } => Self {
                ino: node.inode,
                kind: FileKind::Directory,
                perm: DIR_PERM,
                size: 0,
                nlink: 2,
                uid,
                gid,
                mtime: UNIX_EPOCH,
            },
            NodeKind::File(data) => Self {
                ino: node.inode,
                kind: FileKind::RegularFile,
                perm: FILE_PERM,
                size: data.size,
                nlink: 1,
                uid,
                gid,
                mtime: epoch_seconds(data.mtime),
            },
        }
    }

    /// `st_mode` with file type bits
    pub fn mode(&self) -> u32 {
        let type_bits = match self.kind {
            FileKind::Directory => libc::S_IFDIR,
            FileKind::RegularFile => libc::S_IFREG,
        };
        type_bits as u32 | u32::from(self.perm)
    }
}

fn epoch_seconds(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}
