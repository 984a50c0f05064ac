//! Configuration file support
//!
//! Loads server configuration from TOML files. Every section except
//! `[server]` is optional and falls back to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{
    LogFormat, ServerConfig, StorageConfig, StreamingConfig, TranscodeConfig, TranscodeMode,
};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Storage settings
    pub storage: Option<StorageSettings>,
    /// Range playback settings
    pub streaming: Option<StreamingSettings>,
    /// Transcoder settings
    pub transcode: Option<TranscodeSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
    /// Maximum upload size in MB
    pub max_upload_mb: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub video_dir: Option<PathBuf>,
    pub hls_dir: Option<PathBuf>,
    pub metadata_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingSettings {
    /// Bytes served per partial response
    pub chunk_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeSettings {
    pub ffmpeg_path: Option<PathBuf>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub segment_duration_secs: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_concurrent: Option<usize>,
    /// "background" or "blocking"
    pub mode: Option<TranscodeMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<LogFormat>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: ServerSettings {
                host: defaults.host,
                port: defaults.port,
                cors_enabled: Some(defaults.cors_enabled),
                max_upload_mb: Some(defaults.max_upload_mb),
            },
            storage: Some(StorageSettings {
                video_dir: Some(defaults.storage.video_dir),
                hls_dir: Some(defaults.storage.hls_dir),
                metadata_file: defaults.storage.metadata_file,
            }),
            streaming: Some(StreamingSettings {
                chunk_size_bytes: Some(defaults.streaming.chunk_size_bytes),
            }),
            transcode: Some(TranscodeSettings {
                ffmpeg_path: Some(defaults.transcode.ffmpeg_path),
                video_codec: Some(defaults.transcode.video_codec),
                audio_codec: Some(defaults.transcode.audio_codec),
                segment_duration_secs: Some(defaults.transcode.segment_duration_secs),
                timeout_secs: defaults.transcode.timeout_secs,
                max_concurrent: Some(defaults.transcode.max_concurrent),
                mode: Some(defaults.transcode.mode),
            }),
            logging: Some(LoggingSettings {
                level: defaults.log_level,
                format: Some(defaults.log_format),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();

        let storage = match self.storage {
            Some(s) => StorageConfig {
                video_dir: s.video_dir.unwrap_or(defaults.storage.video_dir),
                hls_dir: s.hls_dir.unwrap_or(defaults.storage.hls_dir),
                metadata_file: s.metadata_file,
            },
            None => defaults.storage,
        };

        let streaming = StreamingConfig {
            chunk_size_bytes: self
                .streaming
                .and_then(|s| s.chunk_size_bytes)
                .filter(|&size| size > 0)
                .unwrap_or(defaults.streaming.chunk_size_bytes),
        };

        let transcode = match self.transcode {
            Some(t) => {
                let d = defaults.transcode;
                TranscodeConfig {
                    ffmpeg_path: t.ffmpeg_path.unwrap_or(d.ffmpeg_path),
                    video_codec: t.video_codec.unwrap_or(d.video_codec),
                    audio_codec: t.audio_codec.unwrap_or(d.audio_codec),
                    segment_duration_secs: t
                        .segment_duration_secs
                        .unwrap_or(d.segment_duration_secs),
                    timeout_secs: t.timeout_secs,
                    max_concurrent: t.max_concurrent.unwrap_or(d.max_concurrent).max(1),
                    mode: t.mode.unwrap_or(d.mode),
                }
            }
            None => defaults.transcode,
        };

        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or(defaults.log_format)),
            None => (defaults.log_level, defaults.log_format),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            cors_enabled: self.server.cors_enabled.unwrap_or(defaults.cors_enabled),
            max_upload_mb: self.server.max_upload_mb.unwrap_or(defaults.max_upload_mb),
            log_level,
            log_format,
            storage,
            streaming,
            transcode,
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    ConfigFile::default_config().to_file(path)
}

/// Load the configuration at `path`. A missing file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ServerConfig::default());
    }
    Ok(ConfigFile::from_file(path)?.into_server_config())
}
