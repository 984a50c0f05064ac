//! Transcode job runner
//!
//! The external transcoder always writes into a private staging directory
//! next to the final output. Only after the process exits cleanly and every
//! segment named by the manifest is on disk is the staging directory renamed
//! into place. A segment set is therefore either absent or complete.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use uuid::Uuid;

use super::manifest::{is_local_segment, Manifest};
use super::{MANIFEST_NAME, SEGMENT_FILENAME_PATTERN};
use crate::config::TranscodeConfig;
use crate::error::TranscodeError;

const STAGING_MARKER: &str = ".staging-";
const RETIRED_MARKER: &str = ".retired-";

/// An external worker that turns one input file into an HLS directory
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Write `master.m3u8` and its segments into `output_dir`, which exists
    /// and is empty.
    async fn transcode(&self, input: &Path, output_dir: &Path) -> Result<(), TranscodeError>;
}

/// Transcoder backed by an `ffmpeg` subprocess
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    leading_args: Vec<OsString>,
    video_codec: String,
    audio_codec: String,
    segment_duration_secs: u32,
}

impl FfmpegTranscoder {
    pub fn new(config: &TranscodeConfig) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            leading_args: Vec::new(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            segment_duration_secs: config.segment_duration_secs.max(1),
        }
    }

    /// Arguments for one run, excluding the program itself.
    pub fn args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args = self.leading_args.clone();
        args.extend(["-hide_banner", "-y", "-i"].map(OsString::from));
        args.push(input.as_os_str().to_owned());

        let duration = self.segment_duration_secs.to_string();
        args.extend(
            [
                "-c:v",
                self.video_codec.as_str(),
                "-c:a",
                self.audio_codec.as_str(),
                "-f",
                "hls",
                "-hls_time",
                duration.as_str(),
                "-hls_list_size",
                "0",
                "-hls_playlist_type",
                "vod",
                "-hls_segment_filename",
            ]
            .map(OsString::from),
        );
        args.push(output_dir.join(SEGMENT_FILENAME_PATTERN).into_os_string());
        args.push(output_dir.join(MANIFEST_NAME).into_os_string());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output_dir: &Path) -> Result<(), TranscodeError> {
        let program = self.program.to_string_lossy().into_owned();
        tracing::info!("Running {} on {}", program, input.display());

        // Dropping the child (deadline elapsed) kills the process
        let mut child = Command::new(&self.program)
            .args(self.args(input, output_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                program: program.clone(),
                source,
            })?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(TranscodeError::Exit {
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Completed, servable segment set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSet {
    pub manifest: PathBuf,
    pub segments: Vec<String>,
}

/// Stages, verifies, and promotes transcoder output
#[derive(Clone)]
pub struct TranscodeRunner {
    transcoder: Arc<dyn Transcoder>,
    deadline: Option<Duration>,
}

impl TranscodeRunner {
    pub fn new(transcoder: Arc<dyn Transcoder>, deadline: Option<Duration>) -> Self {
        Self {
            transcoder,
            deadline,
        }
    }

    /// Transcode `input` into `output_dir`, replacing any previous set.
    pub async fn run(&self, input: &Path, output_dir: &Path) -> Result<SegmentSet, TranscodeError> {
        let staging = sibling(output_dir, STAGING_MARKER)?;
        fs::create_dir_all(&staging).await?;

        let result = self.transcode_into(input, &staging).await;
        let segments = match result {
            Ok(segments) => segments,
            Err(e) => {
                remove_dir_quietly(&staging).await;
                return Err(e);
            }
        };

        if let Err(e) = promote(&staging, output_dir).await {
            remove_dir_quietly(&staging).await;
            return Err(e.into());
        }

        tracing::debug!("Promoted {} into {}", staging.display(), output_dir.display());

        Ok(SegmentSet {
            manifest: output_dir.join(MANIFEST_NAME),
            segments,
        })
    }

    async fn transcode_into(&self, input: &Path, staging: &Path) -> Result<Vec<String>, TranscodeError> {
        let job = self.transcoder.transcode(input, staging);
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, job)
                .await
                .map_err(|_| TranscodeError::Timeout { after: deadline })??,
            None => job.await?,
        }
        verify_segment_set(staging).await
    }
}

/// Check that `dir` holds a closed manifest and every segment it lists.
pub async fn verify_segment_set(dir: &Path) -> Result<Vec<String>, TranscodeError> {
    let manifest_path = dir.join(MANIFEST_NAME);
    let text = fs::read_to_string(&manifest_path)
        .await
        .map_err(|e| TranscodeError::Incomplete(format!("manifest unreadable: {}", e)))?;

    let manifest = Manifest::parse(&text)
        .ok_or_else(|| TranscodeError::Incomplete("manifest is not an HLS playlist".to_string()))?;

    if manifest.segments.is_empty() {
        return Err(TranscodeError::Incomplete(
            "manifest lists no segments".to_string(),
        ));
    }
    if !manifest.ended {
        return Err(TranscodeError::Incomplete(
            "manifest has no end marker".to_string(),
        ));
    }

    for segment in &manifest.segments {
        if !is_local_segment(segment) {
            return Err(TranscodeError::Incomplete(format!(
                "segment {:?} points outside the set",
                segment
            )));
        }
        let is_file = fs::metadata(dir.join(segment))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(TranscodeError::Incomplete(format!(
                "segment {} missing",
                segment
            )));
        }
    }

    Ok(manifest.segments)
}

/// Move a verified staging directory into `target`.
async fn promote(staging: &Path, target: &Path) -> std::io::Result<()> {
    let retired = match fs::metadata(target).await {
        Ok(_) => {
            let retired = sibling(target, RETIRED_MARKER)?;
            fs::rename(target, &retired).await?;
            Some(retired)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    fs::rename(staging, target).await?;

    if let Some(retired) = retired {
        remove_dir_quietly(&retired).await;
    }
    Ok(())
}

/// Hidden sibling of `dir` tagged with `marker` and a random suffix.
fn sibling(dir: &Path, marker: &str) -> std::io::Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no final component", dir.display()),
        )
    })?;
    Ok(dir.with_file_name(format!(
        ".{}{}{}",
        name.to_string_lossy(),
        marker,
        Uuid::new_v4().simple()
    )))
}

async fn remove_dir_quietly(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", dir.display(), e);
        }
    }
}

/// Remove staging and retired directories left behind by an interrupted run.
///
/// Returns the number of directories removed.
pub async fn cleanup_interrupted(root: &Path) -> std::io::Result<usize> {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let leftover = name.starts_with('.')
            && (name.contains(STAGING_MARKER) || name.contains(RETIRED_MARKER));
        if leftover && entry.file_type().await?.is_dir() {
            fs::remove_dir_all(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
