//! Test fixtures for integration tests
//!
//! A server instance rooted in a temporary directory, with a pluggable
//! transcoder so tests never need a real ffmpeg.

use axum::body::Body;
use axum::http::{header, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use crate::config::{ServerConfig, TranscodeMode};
use crate::http::create_router;
use crate::state::AppState;
use crate::storage::{MemoryMetadataStore, MetadataStore};
use crate::transcode::queue::TranscodeStatus;
use crate::transcode::Transcoder;

/// Pseudo-random but deterministic test payload
pub fn media_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

pub struct TestServer {
    pub root: tempfile::TempDir,
    pub state: Arc<AppState>,
}

impl TestServer {
    pub fn new(transcoder: Arc<dyn Transcoder>, mode: TranscodeMode, chunk_size: u64) -> Self {
        let root = tempfile::tempdir().unwrap();
        Self::with_metadata(root, transcoder, mode, chunk_size, Arc::new(MemoryMetadataStore::new()))
    }

    pub fn with_metadata(
        root: tempfile::TempDir,
        transcoder: Arc<dyn Transcoder>,
        mode: TranscodeMode,
        chunk_size: u64,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        let mut config = ServerConfig::default();
        config.storage.video_dir = root.path().join("videos");
        config.storage.hls_dir = root.path().join("videos_hls");
        config.streaming.chunk_size_bytes = chunk_size;
        config.transcode.mode = mode;
        config.transcode.timeout_secs = Some(5);

        let state = Arc::new(AppState::with_transcoder(config, metadata, transcoder));
        Self { root, state }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        create_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn get_range(&self, uri: &str, range: &str) -> Response<Body> {
        self.send(
            Request::get(uri)
                .header(header::RANGE, range)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Upload `data` through `POST /videos` and return the asset JSON
    pub async fn upload(&self, title: &str, filename: &str, data: &[u8]) -> (u16, serde_json::Value) {
        let boundary = "integration-boundary";
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{t}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\nintegration\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: video/mp4\r\n\r\n",
            b = boundary,
            t = title,
            f = filename
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Request::post("/videos")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = self.send(request).await;
        let status = response.status().as_u16();
        let bytes = body_bytes(response).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    /// Poll until the asset's transcode is no longer queued or running
    pub async fn wait_for_transcode(&self, asset_id: &str) -> Option<TranscodeStatus> {
        for _ in 0..200 {
            match self.state.transcodes.status(asset_id) {
                Some(status) if status.is_active() => {}
                other => return other,
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("transcode for {} did not finish", asset_id);
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
