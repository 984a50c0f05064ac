//! Upload ingest
//!
//! Stores the uploaded bytes, records the asset, then hands the stored file
//! to the transcode queue. An asset record only exists once its blob is
//! fully written.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::asset::{new_asset_id, Asset};
use crate::config::TranscodeMode;
use crate::error::IngestError;
use crate::storage::{BlobStore, MetadataStore};
use crate::transcode::TranscodeQueue;

/// Media type recorded when the upload does not declare one
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Client-supplied fields of an upload
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub title: String,
    pub description: String,
    pub filename: String,
    pub media_type: Option<String>,
}

pub struct IngestService {
    blobs: BlobStore,
    metadata: Arc<dyn MetadataStore>,
    transcodes: Arc<TranscodeQueue>,
    video_dir: PathBuf,
    mode: TranscodeMode,
}

impl IngestService {
    pub fn new(
        blobs: BlobStore,
        metadata: Arc<dyn MetadataStore>,
        transcodes: Arc<TranscodeQueue>,
        video_dir: impl Into<PathBuf>,
        mode: TranscodeMode,
    ) -> Self {
        Self {
            blobs,
            metadata,
            transcodes,
            video_dir: video_dir.into(),
            mode,
        }
    }

    /// Store `upload` and register it as a new asset.
    ///
    /// In blocking mode a failed transcode is reported as
    /// [`IngestError::Transcode`]; the asset stays registered and raw
    /// playback keeps working.
    pub async fn ingest<R>(&self, request: IngestRequest, upload: &mut R) -> Result<Asset, IngestError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let filename = sanitize_filename(&request.filename)?;
        let id = new_asset_id();
        let dest = self.video_dir.join(format!("{}_{}", id, filename));

        let written = self.blobs.write_stream(&dest, upload).await?;
        tracing::info!("Stored upload {} ({} bytes) at {}", id, written, dest.display());

        let media_type = request
            .media_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());
        let asset = Asset::with_id(id, request.title, request.description, dest, media_type);

        if let Err(e) = self.metadata.put(asset.clone()).await {
            tracing::error!("Failed to record asset {}: {}", asset.id, e);
            if let Err(cleanup) = self.blobs.remove(&asset.storage_path).await {
                tracing::warn!("Failed to remove orphaned upload: {}", cleanup);
            }
            return Err(e.into());
        }

        match self.mode {
            TranscodeMode::Background => {
                if let Err(e) = self.transcodes.submit(&asset) {
                    tracing::warn!("Transcode not queued for {}: {}", asset.id, e);
                }
            }
            TranscodeMode::Blocking => {
                self.transcodes
                    .run_blocking(&asset)
                    .await
                    .map_err(|source| IngestError::Transcode {
                        asset_id: asset.id.clone(),
                        source,
                    })?;
            }
        }

        Ok(asset)
    }
}

/// Reduce a client filename to a single safe path component.
pub fn sanitize_filename(name: &str) -> Result<String, IngestError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\', '\0'])
        || trimmed.chars().any(char::is_control);

    if invalid {
        return Err(IngestError::InvalidFilename(name.to_string()));
    }
    Ok(trimmed.to_string())
}
