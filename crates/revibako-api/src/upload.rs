//! Handler for `POST /upload/image`.
//!
//! The object store is the local filesystem: files land in the configured
//! `image_dir` and are served under `image_base_url` by whatever fronts the
//! server. Keys follow `{user_id}_{unix_millis}.{ext}` so repeat uploads
//! never collide.

use axum::{Json, extract::{Multipart, State}};
use chrono::Utc;
use revibako_core::store::ReviewStore;
use serde::Serialize;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub image_url: String,
}

/// `POST /upload/image` — multipart form with a `file` part.
pub async fn image<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let mut stored: Option<String> = None;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.to_string()))?
  {
    if field.name() != Some("file") {
      continue;
    }

    let extension = field
      .file_name()
      .and_then(|n| n.rsplit_once('.'))
      .map(|(_, ext)| ext.to_ascii_lowercase())
      .filter(|ext| !ext.is_empty())
      .unwrap_or_else(|| "bin".to_owned());

    let bytes = field
      .bytes()
      .await
      .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if bytes.is_empty() {
      return Err(ApiError::BadRequest("empty file".into()));
    }

    let file_name = format!(
      "{}_{}.{}",
      user.user_id,
      Utc::now().timestamp_millis(),
      extension
    );

    tokio::fs::create_dir_all(&state.config.image_dir)
      .await
      .map_err(|e| {
        tracing::error!(error = %e, "cannot create image directory");
        ApiError::Internal
      })?;
    tokio::fs::write(state.config.image_dir.join(&file_name), &bytes)
      .await
      .map_err(|e| {
        tracing::error!(error = %e, "cannot write uploaded image");
        ApiError::Internal
      })?;

    stored = Some(file_name);
    break;
  }

  let file_name =
    stored.ok_or_else(|| ApiError::BadRequest("file is required".into()))?;

  let image_url = format!(
    "{}/{}",
    state.config.image_base_url.trim_end_matches('/'),
    file_name
  );

  Ok(Json(UploadResponse { image_url }))
}
