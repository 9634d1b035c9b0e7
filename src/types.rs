//! Core types for the content-addressed archive.

use crate::error::StorageError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fingerprint: blake3 digest of `path:mtime:size`, used only to skip rehashing
pub type Fingerprint = [u8; 32];

/// Inode: process-lifetime identifier of a virtual tree node
pub type Inode = u64;

/// HandleId: opaque identifier of an open virtual file
pub type HandleId = u64;

/// Length of a SHA-1 digest in hex characters
pub const CONTENT_HASH_HEX_LEN: usize = 40;

/// ContentHash: SHA-1 digest of a file's bytes, kept as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    /// Build from raw digest bytes
    pub fn from_digest(digest: &[u8]) -> Self {
        ContentHash(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First shard level (`hash[0:2]`)
    pub fn shard_outer(&self) -> &str {
        &self.0[0..2]
    }

    /// Second shard level (`hash[2:4]`)
    pub fn shard_inner(&self) -> &str {
        &self.0[2..4]
    }
}

impl FromStr for ContentHash {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != CONTENT_HASH_HEX_LEN
            || !trimmed.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(StorageError::InvalidHash(s.to_string()));
        }
        Ok(ContentHash(trimmed.to_ascii_lowercase()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
