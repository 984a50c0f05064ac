//! Asset records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One uploaded video and its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Opaque identifier generated at ingest
    pub id: String,
    pub title: String,
    pub description: String,
    /// Absolute path of the original upload
    pub storage_path: PathBuf,
    /// MIME type recorded from the upload
    pub media_type: String,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Create a new asset with a freshly generated id
    #[cfg(test)]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        storage_path: PathBuf,
        media_type: impl Into<String>,
    ) -> Self {
        Self::with_id(new_asset_id(), title, description, storage_path, media_type)
    }

    pub fn with_id(
        id: String,
        title: impl Into<String>,
        description: impl Into<String>,
        storage_path: PathBuf,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            storage_path,
            media_type: media_type.into(),
            created_at: Utc::now(),
        }
    }
}

/// Generate a new asset id
pub fn new_asset_id() -> String {
    Uuid::new_v4().to_string()
}
