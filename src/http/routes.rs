//! Axum router configuration

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{
    get_video, get_video_by_title, health_check, list_videos, transcode_status, version_check,
};
use super::streaming::{segment_file, stream_video};
use super::upload::{retranscode, upload_video};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes());

    let mut router = Router::new()
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Asset records
        .route("/videos", post(upload_video).layer(upload_limit))
        .route("/videos/getAll", get(list_videos))
        .route("/videos/getVideo/{id}", get(get_video))
        .route("/videos/getByTitle/{title}", get(get_video_by_title))
        // Playback
        .route("/videos/streaming/{id}", get(stream_video))
        .route("/videos/{id}/{file}", get(segment_file))
        // Transcode jobs
        .route("/videos/{id}/status", get(transcode_status))
        .route("/videos/{id}/transcode", post(retranscode))
        .layer(TraceLayer::new_for_http());

    if state.config.cors_enabled {
        router = router.layer(cors());
    }

    router.with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS, Method::HEAD])
        .allow_headers([
            header::ACCEPT,
            header::RANGE,
            header::CONTENT_TYPE,
            header::ORIGIN,
        ])
        .expose_headers([header::CONTENT_RANGE, header::CONTENT_LENGTH, header::ACCEPT_RANGES])
        .max_age(Duration::from_secs(3600))
}
