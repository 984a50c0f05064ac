//! Transcode module
//!
//! This module turns a stored upload into an HLS segment set:
//! - `runner`: external transcoder invocation, staging and promotion
//! - `queue`: background scheduling, per-asset exclusivity and job status
//! - `manifest`: playlist inspection used to verify a finished set

pub mod manifest;
pub mod queue;
pub mod runner;

pub use queue::TranscodeQueue;
pub use runner::{FfmpegTranscoder, TranscodeRunner, Transcoder};

use std::path::PathBuf;

/// File name of the playlist inside every segment set
pub const MANIFEST_NAME: &str = "master.m3u8";

/// Segment naming template handed to the transcoder
pub const SEGMENT_FILENAME_PATTERN: &str = "segment_%03d.ts";

/// Where each asset's segment set lives under the HLS root
#[derive(Debug, Clone)]
pub struct SegmentLayout {
    root: PathBuf,
}

impl SegmentLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn asset_dir(&self, asset_id: &str) -> PathBuf {
        self.root.join(asset_id)
    }

    pub fn manifest_path(&self, asset_id: &str) -> PathBuf {
        self.asset_dir(asset_id).join(MANIFEST_NAME)
    }

    pub fn segment_path(&self, asset_id: &str, segment: &str) -> PathBuf {
        self.asset_dir(asset_id).join(segment)
    }
}
