//! xxHash-based content hashing for stage outputs
//!
//! Lets a stage recognise that the output it is about to write is already on
//! disk byte-for-byte, so re-runs leave unchanged files (and their mtimes)
//! alone and never take a pointless backup.

use crate::error::Result;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// Read buffer for streaming file hashes
const CHUNK_SIZE: usize = 64 * 1024;

/// Hash an in-memory buffer
pub fn compute_content_hash(content: &[u8]) -> u64 {
    xxh3_64(content)
}

/// Hash a file's contents without loading it all at once
pub fn compute_file_hash(path: &Path) -> Result<u64> {
    let mut file = File::open(path)?;
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let hash = hasher.digest();
    trace!(?path, hash, "Computed file hash");
    Ok(hash)
}

/// Whether `path` exists and already holds exactly `content`
pub fn matches_content(path: &Path, content: &[u8]) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let metadata = std::fs::metadata(path)?;
    if metadata.len() != content.len() as u64 {
        return Ok(false);
    }
    Ok(compute_file_hash(path)? == compute_content_hash(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_hash_matches_buffer_hash() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"export default function Home() {}").unwrap();
        file.flush().unwrap();

        let hash = compute_file_hash(file.path()).unwrap();
        assert_eq!(hash, compute_content_hash(b"export default function Home() {}"));
    }

    #[test]
    fn test_matches_content() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"content 1").unwrap();
        file.flush().unwrap();

        assert!(matches_content(file.path(), b"content 1").unwrap());
        assert!(!matches_content(file.path(), b"content 2").unwrap());
        assert!(!matches_content(file.path(), b"content 12").unwrap());
        assert!(!matches_content(Path::new("/definitely/not/here"), b"x").unwrap());
    }

    #[test]
    fn test_large_content_streams() {
        let content = vec![b'x'; CHUNK_SIZE * 2 + 17];
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&content).unwrap();
        file.flush().unwrap();

        assert_eq!(
            compute_file_hash(file.path()).unwrap(),
            compute_content_hash(&content)
        );
    }
}
