//! Playback endpoints
//!
//! Raw range playback of the original upload, plus verbatim delivery of the
//! manifest and segments of a finished segment set.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::handlers::{find_asset, HttpError};
use crate::error::RangeError;
use crate::ingest::DEFAULT_MEDIA_TYPE;
use crate::range;
use crate::state::AppState;
use crate::transcode::MANIFEST_NAME;

const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<Option<regex::Regex>> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).ok()).as_ref()
    }};
}

/// Asset ids as generated at ingest, no path syntax
pub fn is_valid_asset_id(id: &str) -> bool {
    regex!(r"^[A-Za-z0-9_-]+$").is_some_and(|re| re.is_match(id))
}

/// Segment file names, no path syntax
pub fn is_valid_segment_name(name: &str) -> bool {
    regex!(r"^[A-Za-z0-9_-]+\.ts$").is_some_and(|re| re.is_match(name))
}

/// GET /videos/streaming/{id}
///
/// Serves one chunk of the original file. A `Range` header is required.
pub async fn stream_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request_headers: HeaderMap,
) -> Result<Response, HttpError> {
    let asset = find_asset(&state, &id).await?;
    let total = state.blobs.size(&asset.storage_path).await?;

    let range_header = request_headers
        .get(header::RANGE)
        .map(|v| {
            v.to_str()
                .map_err(|_| RangeError::Malformed("non-ASCII range header".to_string()))
        })
        .transpose()?;
    let window = range::resolve(range_header, total, state.chunk_size())?;
    tracing::debug!("Streaming {} bytes {}", asset.id, window.content_range());

    let body = state
        .blobs
        .read_range(&asset.storage_path, window.start, window.end)
        .await?;

    let mut headers = no_cache_headers();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&asset.media_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MEDIA_TYPE)),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(window.len()));
    if let Ok(value) = HeaderValue::from_str(&window.content_range()) {
        headers.insert(header::CONTENT_RANGE, value);
    }

    Ok((StatusCode::PARTIAL_CONTENT, headers, body).into_response())
}

/// GET /videos/{id}/master.m3u8 and GET /videos/{id}/{segment}.ts
pub async fn segment_file(
    State(state): State<Arc<AppState>>,
    Path((id, file)): Path<(String, String)>,
) -> Result<Response, HttpError> {
    let not_found = || HttpError::NotFound(format!("No such file: {}/{}", id, file));

    if !is_valid_asset_id(&id) {
        return Err(not_found());
    }
    let layout = state.transcodes.layout();
    let (content_type, path) = if file == MANIFEST_NAME {
        (MANIFEST_CONTENT_TYPE, layout.manifest_path(&id))
    } else if is_valid_segment_name(&file) {
        (SEGMENT_CONTENT_TYPE, layout.segment_path(&id, &file))
    } else {
        return Err(not_found());
    };

    if !state.blobs.exists(&path).await {
        return Err(not_found());
    }
    let reader = match state.blobs.open(&path).await {
        Ok(reader) => reader,
        Err(e) if e.is_not_found() => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Ok((headers, Body::from_stream(ReaderStream::new(reader))).into_response())
}

fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_validation() {
        assert!(is_valid_asset_id("3f2b8c1e-7a4d-4c55-9e0f-1b2a3c4d5e6f"));
        assert!(is_valid_asset_id("clip_01"));
        assert!(!is_valid_asset_id(""));
        assert!(!is_valid_asset_id(".."));
        assert!(!is_valid_asset_id("a.b"));
        assert!(!is_valid_asset_id("a/b"));
    }

    #[test]
    fn test_segment_name_validation() {
        assert!(is_valid_segment_name("segment_000.ts"));
        assert!(!is_valid_segment_name("segment_000.mp4"));
        assert!(!is_valid_segment_name("..ts"));
        assert!(!is_valid_segment_name(".ts"));
        assert!(!is_valid_segment_name("a/b.ts"));
    }

    #[test]
    fn test_no_cache_headers() {
        let headers = no_cache_headers();
        assert_eq!(
            headers.get(header::CACHE_CONTROL).unwrap(),
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(headers.get(header::EXPIRES).unwrap(), "0");
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    }
}
