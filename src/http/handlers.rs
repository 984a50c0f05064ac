//! HTTP request handlers
//!
//! Error mapping, asset lookups and job status. Streaming and upload
//! handlers live in their own modules.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::asset::Asset;
use crate::error::{IngestError, MetadataError, RangeError, StorageError, TranscodeError};
use crate::state::AppState;

/// Message body returned for errors and acknowledgements
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl Message {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    Range(RangeError),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            HttpError::Range(RangeError::NotSatisfiable { .. }) => {
                (StatusCode::RANGE_NOT_SATISFIABLE, self.message())
            }
            HttpError::Range(_) | HttpError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.message())
            }
            HttpError::NotFound(_) => (StatusCode::NOT_FOUND, self.message()),
            HttpError::Conflict(_) => (StatusCode::CONFLICT, self.message()),
            HttpError::InternalError(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let mut response = (status, Json(Message::error(message))).into_response();
        if let HttpError::Range(RangeError::NotSatisfiable { total, .. }) = self {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", total)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}

impl HttpError {
    fn message(&self) -> String {
        match self {
            HttpError::Range(e) => e.to_string(),
            HttpError::BadRequest(msg)
            | HttpError::NotFound(msg)
            | HttpError::Conflict(msg)
            | HttpError::InternalError(msg) => msg.clone(),
        }
    }
}

impl From<RangeError> for HttpError {
    fn from(err: RangeError) -> Self {
        HttpError::Range(err)
    }
}

impl From<StorageError> for HttpError {
    fn from(err: StorageError) -> Self {
        HttpError::InternalError(err.to_string())
    }
}

impl From<MetadataError> for HttpError {
    fn from(err: MetadataError) -> Self {
        HttpError::InternalError(err.to_string())
    }
}

impl From<TranscodeError> for HttpError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::InProgress(id) => {
                HttpError::Conflict(format!("Transcode already running for {}", id))
            }
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

impl From<IngestError> for HttpError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::InvalidFilename(name) => {
                HttpError::BadRequest(format!("Invalid filename: {:?}", name))
            }
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

/// Look up an asset or fail with 404
pub async fn find_asset(state: &AppState, id: &str) -> Result<Asset, HttpError> {
    state
        .metadata
        .get(id)
        .await?
        .ok_or_else(|| HttpError::NotFound(format!("Video not found: {}", id)))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("vod-server v", env!("CARGO_PKG_VERSION"))
}

/// GET /videos/getAll
pub async fn list_videos(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Asset>>, HttpError> {
    Ok(Json(state.metadata.list().await?))
}

/// GET /videos/getVideo/{id}
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Asset>, HttpError> {
    Ok(Json(find_asset(&state, &id).await?))
}

/// GET /videos/getByTitle/{title}
pub async fn get_video_by_title(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> Result<Json<Asset>, HttpError> {
    state
        .metadata
        .find_by_title(&title)
        .await?
        .map(Json)
        .ok_or_else(|| HttpError::NotFound(format!("No video titled {:?}", title)))
}

/// GET /videos/{id}/status
pub async fn transcode_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let asset = find_asset(&state, &id).await?;

    let mut body = match state.transcodes.status(&asset.id) {
        Some(status) => serde_json::to_value(status)
            .map_err(|e| HttpError::InternalError(e.to_string()))?,
        None => serde_json::json!({ "status": "not_started" }),
    };
    if let Some(map) = body.as_object_mut() {
        map.insert("id".to_string(), serde_json::Value::String(asset.id));
    }
    Ok(Json(body))
}
