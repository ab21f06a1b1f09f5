//! SHA-256 checksum utilities
//!
//! Checksums use the canonical format `sha256:<hex>`. File checksums are
//! computed by streaming fixed-size blocks so large payloads are never held
//! in memory at once.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Block size used when streaming a file through the hasher
pub const BLOCK_SIZE: usize = 4096;

/// Compute the SHA-256 checksum of in-memory content.
pub fn compute_content_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_file_checksum(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut block = [0u8; BLOCK_SIZE];
    loop {
        let read = file.read(&mut block)?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
    }
    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_checksum_has_prefix() {
        let checksum = compute_content_checksum(b"hello world");
        assert!(checksum.starts_with("sha256:"));
    }

    #[test]
    fn different_content_different_checksum() {
        let a = compute_content_checksum(b"aaa");
        let b = compute_content_checksum(b"bbb");
        assert_ne!(a, b);
    }

    #[test]
    fn content_checksum_known_value() {
        let checksum = compute_content_checksum(b"hello world");
        assert_eq!(
            checksum,
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn file_checksum_matches_content_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();

        let file_cs = compute_file_checksum(&path).unwrap();
        let content_cs = compute_content_checksum(b"hello world");
        assert_eq!(file_cs, content_cs);
    }

    #[test]
    fn file_checksum_spans_multiple_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.bin");
        let content: Vec<u8> = (0..BLOCK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        assert_eq!(
            compute_file_checksum(&path).unwrap(),
            compute_content_checksum(&content)
        );
    }

    #[test]
    fn empty_file_matches_empty_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, "").unwrap();

        assert_eq!(
            compute_file_checksum(&path).unwrap(),
            compute_content_checksum(b"")
        );
    }
}
