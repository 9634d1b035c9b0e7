//! FUSE transport adapter.
//!
//! Translates kernel requests delivered by `fuser` into [`ArchiveFs`] calls and
//! their results back into replies. Nothing here holds filesystem state.

use crate::vfs::{AccessMode, ArchiveFs, FileAttributes, FileKind};
use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, Request,
};
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Mount parameters
#[derive(Debug, Clone)]
pub struct MountSettings {
    pub fs_name: String,
    pub ttl: Duration,
    pub debug: bool,
}

impl Default for MountSettings {
    fn default() -> Self {
        Self {
            fs_name: "cairn".to_string(),
            ttl: Duration::from_secs(1),
            debug: false,
        }
    }
}

/// `fuser::Filesystem` implementation over an [`ArchiveFs`]
pub struct FuseAdapter {
    fs: ArchiveFs,
    ttl: Duration,
}

impl FuseAdapter {
    pub fn new(fs: ArchiveFs, ttl: Duration) -> Self {
        Self { fs, ttl }
    }
}

impl From<&FileAttributes> for FileAttr {
    fn from(a: &FileAttributes) -> Self {
        FileAttr {
            ino: a.ino,
            size: a.size,
            blocks: a.size.div_ceil(512),
            atime: a.mtime,
            mtime: a.mtime,
            ctime: a.mtime,
            crtime: a.mtime,
            kind: match a.kind {
                FileKind::Directory => FileType::Directory,
                FileKind::RegularFile => FileType::RegularFile,
            },
            perm: a.perm,
            nlink: a.nlink,
            uid: a.uid,
            gid: a.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

impl Filesystem for FuseAdapter {
    fn destroy(&mut self) {
        self.fs.release_all();
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.lookup(parent, name) {
            Ok(attr) if attr.is_sentinel() => reply.error(libc::ENOENT),
            Ok(attr) => reply.entry(&self.ttl, &FileAttr::from(&attr), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.fs.try_attributes(ino) {
            Ok(attr) => reply.attr(&self.ttl, &FileAttr::from(&attr)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.fs.open_directory(ino) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let start = u64::try_from(offset).unwrap_or(0);
        let result = self.fs.read_directory(ino, start, |name, attr, next| {
            let kind = match attr.kind {
                FileKind::Directory => FileType::Directory,
                FileKind::RegularFile => FileType::RegularFile,
            };
            // `add` reports true once the buffer is full
            !reply.add(attr.ino, next as i64, kind, name)
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.fs.open_file(ino, AccessMode::from_flags(flags)) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.fs.read(fh, offset, size as usize) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.fs.release(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }
}

/// Mount `fs` read-only at `mountpoint` and serve until unmounted
pub fn mount(fs: ArchiveFs, mountpoint: &Path, settings: &MountSettings) -> io::Result<()> {
    let mut options = vec![
        MountOption::RO,
        MountOption::FSName(settings.fs_name.clone()),
        MountOption::DefaultPermissions,
    ];
    if settings.debug {
        options.push(MountOption::CUSTOM("debug".to_string()));
    }
    info!(mountpoint = %mountpoint.display(), fs_name = %settings.fs_name, "Mounting");
    let adapter = FuseAdapter::new(fs, settings.ttl);
    fuser::mount2(adapter, mountpoint, &options)?;
    debug!(mountpoint = %mountpoint.display(), "Unmounted");
    Ok(())
}
