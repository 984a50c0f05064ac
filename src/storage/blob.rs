//! File-backed blob store
//!
//! Uploads are streamed to a hidden sibling file and renamed into place, so a
//! reader never observes a partially written asset.

use bytes::Bytes;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, Default)]
pub struct BlobStore;

impl BlobStore {
    pub fn new() -> Self {
        Self
    }

    /// Copy `source` to `dest`, replacing any existing file and creating
    /// parent directories. Returns the number of bytes written.
    pub async fn write_stream<R>(&self, dest: &Path, source: &mut R) -> Result<u64, StorageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let write_err = |source| StorageError::Write {
            path: dest.to_path_buf(),
            source,
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let part = part_path(dest);
        match copy_to(&part, source).await {
            Ok(written) => {
                if let Err(e) = fs::rename(&part, dest).await {
                    let _ = fs::remove_file(&part).await;
                    return Err(write_err(e));
                }
                tracing::debug!("Stored {} bytes at {}", written, dest.display());
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&part).await;
                Err(write_err(e))
            }
        }
    }

    /// Read exactly the inclusive window `start..=end` from `path`.
    ///
    /// A file shorter than the window is an error, never a short body.
    pub async fn read_range(&self, path: &Path, start: u64, end: u64) -> Result<Bytes, StorageError> {
        if end < start {
            return Err(StorageError::InvalidWindow { start, end });
        }
        let read_err = |source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        };

        let expected = end - start + 1;
        let mut file = fs::File::open(path).await.map_err(read_err)?;
        file.seek(SeekFrom::Start(start)).await.map_err(read_err)?;

        let mut buf = Vec::with_capacity(expected as usize);
        file.take(expected)
            .read_to_end(&mut buf)
            .await
            .map_err(read_err)?;

        let actual = buf.len() as u64;
        if actual != expected {
            return Err(StorageError::ShortRead {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }
        Ok(Bytes::from(buf))
    }

    /// Open `path` for streaming to a client.
    pub async fn open(&self, path: &Path) -> Result<fs::File, StorageError> {
        fs::File::open(path)
            .await
            .map_err(|source| StorageError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Current size of the file at `path`.
    pub async fn size(&self, path: &Path) -> Result<u64, StorageError> {
        fs::metadata(path)
            .await
            .map(|m| m.len())
            .map_err(|source| StorageError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Whether a regular file exists at `path`.
    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Delete the file at `path`; a missing file is not an error.
    pub async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Delete `.part` files left in `dir` by uploads that never finished.
///
/// Returns the number of files removed.
pub async fn cleanup_partial_uploads(dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if is_part_name(&name) && entry.file_type().await?.is_file() {
            fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn is_part_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(PART_SUFFIX)
}

const PART_SUFFIX: &str = ".part";

async fn copy_to<R>(part: &Path, source: &mut R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = fs::File::create(part).await?;
    let written = tokio::io::copy(source, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn part_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.{}{}", name, Uuid::new_v4().simple(), PART_SUFFIX))
}
