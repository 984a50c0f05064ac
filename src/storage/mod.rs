//! Storage module
//!
//! This module handles everything that touches durable state:
//! - Blob store for original uploads and segment files
//! - Metadata store for asset records
//! - Directory layout for uploads and segment sets

pub mod blob;
pub mod metadata;

pub use blob::BlobStore;
pub use metadata::{JsonFileMetadataStore, MemoryMetadataStore, MetadataStore};

use std::path::Path;

/// Create `dir` if it does not exist yet.
///
/// Returns `true` when the directory was created by this call.
pub async fn ensure_dir(dir: &Path) -> std::io::Result<bool> {
    match tokio::fs::metadata(dir).await {
        Ok(m) if m.is_dir() => Ok(false),
        Ok(_) => Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", dir.display()),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(dir).await?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("videos");

        assert!(ensure_dir(&dir).await.unwrap());
        assert!(!ensure_dir(&dir).await.unwrap());

        let file = root.path().join("plain");
        std::fs::write(&file, b"x").unwrap();
        assert!(ensure_dir(&file).await.is_err());
    }
}
