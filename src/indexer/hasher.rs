//! Content hash computation for indexed files

use crate::types::ContentHash;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const READ_CHUNK: usize = 64 * 1024;

/// Hash a reader's bytes, returning the digest and the number of bytes consumed
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<(ContentHash, u64)> {
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((ContentHash::from_digest(&hasher.finalize()), total))
}

/// Hash a file's full content
pub fn hash_file(path: &Path) -> io::Result<(ContentHash, u64)> {
    let file = File::open(path)?;
    hash_reader(file)
}
