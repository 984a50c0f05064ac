//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Server configuration
//! - Blob and metadata stores
//! - Transcode queue and ingest service

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ingest::IngestService;
use crate::storage::{BlobStore, MetadataStore};
use crate::transcode::{FfmpegTranscoder, SegmentLayout, TranscodeQueue, TranscodeRunner, Transcoder};

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    pub blobs: BlobStore,
    pub metadata: Arc<dyn MetadataStore>,
    pub transcodes: Arc<TranscodeQueue>,
    pub ingest: IngestService,
}

impl AppState {
    /// Build the state around the configured ffmpeg transcoder
    pub fn new(config: ServerConfig, metadata: Arc<dyn MetadataStore>) -> Self {
        let transcoder = Arc::new(FfmpegTranscoder::new(&config.transcode));
        Self::with_transcoder(config, metadata, transcoder)
    }

    pub fn with_transcoder(
        config: ServerConfig,
        metadata: Arc<dyn MetadataStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let blobs = BlobStore::new();
        let runner = TranscodeRunner::new(transcoder, config.transcode.timeout());
        let transcodes = Arc::new(TranscodeQueue::new(
            runner,
            SegmentLayout::new(&config.storage.hls_dir),
            config.transcode.max_concurrent,
        ));
        let ingest = IngestService::new(
            blobs,
            metadata.clone(),
            transcodes.clone(),
            &config.storage.video_dir,
            config.transcode.mode,
        );

        Self {
            config,
            blobs,
            metadata,
            transcodes,
            ingest,
        }
    }

    /// Bytes served per range response
    pub fn chunk_size(&self) -> u64 {
        self.config.streaming.chunk_size_bytes.max(1)
    }
}
