//! Upload and re-transcode endpoints

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::StreamReader;

use super::handlers::{find_asset, HttpError, Message};
use crate::asset::Asset;
use crate::ingest::IngestRequest;
use crate::state::AppState;

/// POST /videos
///
/// Multipart form with `file`, `title` and `description` parts. The file part
/// is streamed straight to storage; text parts that arrive after it are
/// applied to the stored record.
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Asset>, HttpError> {
    let mut title = None;
    let mut description = None;
    let mut asset: Option<Asset> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(text(field).await?),
            "description" => description = Some(text(field).await?),
            "file" if asset.is_none() => {
                let request = IngestRequest {
                    title: title.clone().unwrap_or_default(),
                    description: description.clone().unwrap_or_default(),
                    filename: field.file_name().unwrap_or_default().to_string(),
                    media_type: field.content_type().map(str::to_string),
                };
                let mut reader = Box::pin(StreamReader::new(
                    field.map_err(std::io::Error::other),
                ));
                asset = Some(state.ingest.ingest(request, &mut reader).await?);
            }
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    let mut asset = asset.ok_or_else(|| HttpError::BadRequest("Missing file part".to_string()))?;

    let late_title = title.filter(|t| *t != asset.title);
    let late_description = description.filter(|d| *d != asset.description);
    if late_title.is_some() || late_description.is_some() {
        if let Some(t) = late_title {
            asset.title = t;
        }
        if let Some(d) = late_description {
            asset.description = d;
        }
        state.metadata.put(asset.clone()).await?;
    }

    tracing::info!("Ingested {} ({:?})", asset.id, asset.title);
    Ok(Json(asset))
}

async fn text(field: Field<'_>) -> Result<String, HttpError> {
    field
        .text()
        .await
        .map_err(|e| HttpError::BadRequest(format!("Invalid form field: {}", e)))
}

/// POST /videos/{id}/transcode
pub async fn retranscode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Message>), HttpError> {
    let asset = find_asset(&state, &id).await?;
    state.transcodes.submit(&asset)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(Message::ok(format!("Transcode queued for {}", asset.id))),
    ))
}
