//! Handlers for `/user/profile`.

use axum::{Json, extract::State};
use revibako_core::{
  store::ReviewStore,
  user::{ProfileUpdate, User, validate_username},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
  pub user: User,
}

/// `GET /user/profile` — the caller's own profile.
pub async fn get_own<S>(
  State(_state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<ProfileResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  Ok(Json(ProfileResponse { user }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub username:   String,
  pub avatar_url: Option<String>,
}

/// `PUT /user/profile` — body: `{"username":..., "avatar_url":...}`.
pub async fn update_own<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<UpdateBody>,
) -> Result<Json<ProfileResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let username = validate_username(&body.username)?;

  let user = state
    .store
    .update_profile(user.user_id, ProfileUpdate {
      username,
      avatar_url: body.avatar_url,
    })
    .await
    .map_err(ApiError::store)?;

  Ok(Json(ProfileResponse { user }))
}
