//! Cairn: Content-Addressed File Archive
//!
//! Indexes directory trees by SHA-1 content hash, copies each distinct content
//! once into a sharded store, rebuilds trees as symlinks into that store, and
//! serves an index as a read-only virtual filesystem.

pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod logging;
pub mod reconstruct;
pub mod store;
pub mod tooling;
pub mod types;
pub mod vfs;
