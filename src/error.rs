//! Error types for the archive library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing index files and the content store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Index file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid content hash: {0:?}")]
    InvalidHash(String),

    #[error("Invalid index record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}

/// Errors surfaced by batch jobs and the command line
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::StorageError(StorageError::IoError(err))
    }
}

/// Per-request failures of the virtual filesystem
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such entry")]
    NotFound,

    #[error("access denied")]
    AccessDenied,

    #[error("unknown file handle {0}")]
    BadHandle(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// errno reported to the filesystem transport
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::AccessDenied => libc::EACCES,
            FsError::BadHandle(_) => libc::EBADF,
            FsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}
