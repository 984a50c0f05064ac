use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the video server
#[derive(Error, Debug)]
pub enum VodError {
    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Transcoding error: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while resolving a `Range` header
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Range header is required")]
    Missing,

    #[error("Malformed range header: {0}")]
    Malformed(String),

    #[error("Range start {start} not satisfiable for length {total}")]
    NotSatisfiable { start: u64, total: u64 },
}

/// Blob store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Short read from {path}: expected {expected} bytes, got {actual}")]
    ShortRead {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid byte window {start}-{end}")]
    InvalidWindow { start: u64, end: u64 },
}

impl StorageError {
    /// True when the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::Read { source, .. } | StorageError::Write { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// Metadata store errors
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to persist metadata to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load metadata from {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Transcode job errors
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to spawn transcoder {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcoder exited with code {code:?}")]
    Exit { code: Option<i32> },

    #[error("Transcoder timed out after {after:?}")]
    Timeout { after: std::time::Duration },

    #[error("Incomplete segment set: {0}")]
    Incomplete(String),

    #[error("Transcode already in progress for asset {0}")]
    InProgress(String),

    #[error("Transcode task failed: {0}")]
    Task(String),

    #[error("IO error during transcode: {0}")]
    Io(#[from] std::io::Error),
}

/// Ingest pipeline errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid upload filename: {0}")]
    InvalidFilename(String),

    #[error("Failed to store upload: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to record asset: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Asset {asset_id} stored but transcoding failed: {source}")]
    Transcode {
        asset_id: String,
        #[source]
        source: TranscodeError,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, VodError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found() {
        let err = StorageError::Read {
            path: PathBuf::from("/missing"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_not_found());

        let err = StorageError::ShortRead {
            path: PathBuf::from("/short"),
            expected: 10,
            actual: 4,
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_conversion() {
        let err: VodError = RangeError::Missing.into();
        assert!(matches!(err, VodError::Range(RangeError::Missing)));
        assert!(err.to_string().contains("required"));
    }
}
