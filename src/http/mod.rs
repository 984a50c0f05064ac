//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with all video endpoints
//! - Asset lookups, job status and error mapping
//! - Range playback and segment set delivery
//! - Multipart upload and re-transcode
//! - CORS middleware

pub mod handlers;
pub mod routes;
pub mod streaming;
pub mod upload;

pub use routes::create_router;
