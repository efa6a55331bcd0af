//! Filesystem content-addressed blob store

use crate::cas::atomic::atomic_write;
use crate::cas::sharding::{is_digest, shard_path};
use crate::errors::{cas_collision, cas_corrupt, cas_missing, invalid_digest, io_error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Lowercase hex SHA-256 of `content`
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Blobs named by the SHA-256 of their bytes, all sharing one extension
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
    extension: &'static str,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>, extension: &'static str) -> Self {
        Self {
            root: root.into(),
            extension,
        }
    }

    /// Write content and return its digest
    ///
    /// - Idempotent: writing the same content twice succeeds
    /// - Detects collisions: different bytes already stored under the digest fail
    pub fn write(&self, content: &[u8]) -> Result<String> {
        let digest = sha256_hex(content);
        let target_path = shard_path(&self.root, &digest, self.extension);

        match fs::read(&target_path) {
            Ok(existing) if existing == content => return Ok(digest),
            Ok(_) => return Err(cas_collision(&digest)),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("read_cas", e)),
        }

        atomic_write(&target_path, content)?;
        tracing::debug!(digest = %digest, bytes = content.len(), "stored blob");

        Ok(digest)
    }

    /// Read content by digest, verifying it still hashes to its name
    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        if !is_digest(digest) {
            return Err(invalid_digest(digest));
        }
        let path = shard_path(&self.root, digest, self.extension);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(cas_missing(digest)),
            Err(e) => return Err(io_error("read_cas", e)),
        };

        let actual = sha256_hex(&content);
        if actual != digest {
            return Err(cas_corrupt(digest, &actual));
        }
        Ok(content)
    }

    pub fn contains(&self, digest: &str) -> bool {
        is_digest(digest) && shard_path(&self.root, digest, self.extension).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldelta_core::errors::MdErrorKind;
    use tempfile::TempDir;

    fn setup() -> (ContentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path(), "json");
        (store, temp_dir)
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (store, _dir) = setup();

        let digest = store.write(b"{\"entries\":[]}").unwrap();

        assert_eq!(digest.len(), 64);
        assert!(store.contains(&digest));
        assert_eq!(store.read(&digest).unwrap(), b"{\"entries\":[]}");
    }

    #[test]
    fn test_idempotent_write() {
        let (store, _dir) = setup();

        let first = store.write(b"same").unwrap();
        let second = store.write(b"same").unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_collision_detected() {
        let (store, dir) = setup();
        let digest = sha256_hex(b"original");
        let path = shard_path(dir.path(), &digest, "json");
        atomic_write(&path, b"impostor").unwrap();

        let err = store.write(b"original").unwrap_err();

        assert_eq!(err.kind(), MdErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_read_missing() {
        let (store, _dir) = setup();

        let err = store.read(&"0".repeat(64)).unwrap_err();

        assert_eq!(err.kind(), MdErrorKind::NotFound);
    }

    #[test]
    fn test_read_rejects_tampered_blob() {
        let (store, dir) = setup();
        let digest = store.write(b"pristine").unwrap();
        fs::write(shard_path(dir.path(), &digest, "json"), b"tampered").unwrap();

        let err = store.read(&digest).unwrap_err();

        assert_eq!(err.kind(), MdErrorKind::Persistence);
    }

    #[test]
    fn test_read_rejects_path_like_digest() {
        let (store, _dir) = setup();

        let err = store.read("../../etc/passwd").unwrap_err();

        assert_eq!(err.kind(), MdErrorKind::ConstraintViolation);
    }
}
