//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default span served per partial-content response (1 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the original uploaded files
    pub video_dir: PathBuf,

    /// Directory holding one segment set per asset
    pub hls_dir: PathBuf,

    /// JSON file backing the metadata store; in-memory only when unset
    pub metadata_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("videos"),
            hls_dir: PathBuf::from("videos_hls"),
            metadata_file: None,
        }
    }
}

/// Range playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Maximum bytes served per range response
    pub chunk_size_bytes: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// When transcoding runs relative to the upload request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscodeMode {
    /// Queue the job and answer the upload immediately
    Background,
    /// Hold the upload response until the transcode finishes
    Blocking,
}

/// External transcoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Transcoder executable
    pub ffmpeg_path: PathBuf,

    /// Video encoder passed to `-c:v`
    pub video_codec: String,

    /// Audio encoder passed to `-c:a`
    pub audio_codec: String,

    /// Target segment duration in seconds
    pub segment_duration_secs: u32,

    /// Kill the transcoder after this many seconds
    pub timeout_secs: Option<u64>,

    /// Maximum transcodes running at once
    pub max_concurrent: usize,

    /// Background or blocking ingest
    pub mode: TranscodeMode,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            segment_duration_secs: 10,
            timeout_secs: Some(3600),
            max_concurrent: 2,
            mode: TranscodeMode::Background,
        }
    }
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Maximum upload size in megabytes
    pub max_upload_mb: usize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,

    pub storage: StorageConfig,

    pub streaming: StreamingConfig,

    pub transcode: TranscodeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
            max_upload_mb: 2048,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            storage: StorageConfig::default(),
            streaming: StreamingConfig::default(),
            transcode: TranscodeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the upload limit in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}
