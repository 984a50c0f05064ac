//! Video ingest and streaming server
//!
//! Accepts uploads, stores them on disk, transcodes each one into an HLS
//! segment set with an external ffmpeg process, and serves both the original
//! file (HTTP range requests) and the segment set.

mod asset;
mod config;
mod config_file;
mod error;
mod http;
mod ingest;
#[cfg(test)]
mod integration;
mod range;
mod state;
mod storage;
mod transcode;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, ServerConfig};
use crate::error::{Result, VodError};
use crate::http::create_router;
use crate::state::AppState;
use crate::storage::{ensure_dir, JsonFileMetadataStore, MemoryMetadataStore, MetadataStore};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "vod-server";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let first = args.next();

    // vod-server --generate-config [path]
    if first.as_deref() == Some("--generate-config") {
        let path = args.next().unwrap_or_else(|| "config.toml".to_string());
        config_file::generate_default_config(&path)
            .map_err(|e| VodError::Config(format!("{}: {}", path, e)))?;
        println!("Wrote default configuration to {}", path);
        return Ok(());
    }

    // Load configuration
    let config_path = first.unwrap_or_else(|| "config.toml".to_string());
    let loaded = config_file::load_config(&config_path);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => ServerConfig::default(),
    };

    // Initialize logging
    init_logging(&config.log_level, config.log_format);
    if let Err(e) = &loaded {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    tracing::info!("Configuration loaded: {:?}", config);

    let config = prepare_storage(config).await?;
    let metadata = open_metadata(&config).await?;

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), metadata));

    let assets = state.metadata.list().await?;
    let ready = state.transcodes.recover(&assets).await;
    tracing::info!("{} assets known, {} with segment sets", assets.len(), ready);

    // Build router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| VodError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Create the storage directories, resolve them to absolute paths, and
/// clear out what interrupted uploads and transcodes left behind.
async fn prepare_storage(mut config: ServerConfig) -> Result<ServerConfig> {
    for dir in [&mut config.storage.video_dir, &mut config.storage.hls_dir] {
        if ensure_dir(dir.as_path()).await? {
            tracing::info!("Created directory {}", dir.display());
        }
        *dir = tokio::fs::canonicalize(&*dir).await?;
    }

    let removed = transcode::runner::cleanup_interrupted(&config.storage.hls_dir).await?;
    if removed > 0 {
        tracing::warn!("Removed {} unfinished segment sets", removed);
    }
    let removed = storage::blob::cleanup_partial_uploads(&config.storage.video_dir).await?;
    if removed > 0 {
        tracing::warn!("Removed {} unfinished uploads", removed);
    }
    Ok(config)
}

async fn open_metadata(config: &ServerConfig) -> Result<Arc<dyn MetadataStore>> {
    match &config.storage.metadata_file {
        Some(path) => {
            tracing::info!("Using metadata file {}", path.display());
            Ok(Arc::new(JsonFileMetadataStore::open(path).await?))
        }
        None => {
            tracing::info!("Using in-memory metadata store");
            Ok(Arc::new(MemoryMetadataStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Initialize logging with tracing
fn init_logging(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("vod_server={},tower_http=debug", level).into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
