//! Handlers for the `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Bridge-authenticated; creates user + session |
//! | `POST` | `/auth/login` | Bridge-authenticated; session for existing user |

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::Utc;
use revibako_core::{
  session::{NewSession, session_ttl},
  store::ReviewStore,
  user::{NewUser, User, validate_username},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{issue_token, verify_provider},
  error::ApiError,
};

/// Returned by both registration and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
  pub user:  User,
  /// Opaque bearer token; shown exactly once.
  pub token: String,
}

async fn issue_session<S>(store: &S, user_id: Uuid) -> Result<String, ApiError>
where
  S: ReviewStore,
{
  let (token, digest) = issue_token();
  store
    .create_session(NewSession {
      user_id,
      token_digest: digest,
      expires_at: Utc::now() + session_ttl(),
    })
    .await
    .map_err(ApiError::store)?;
  Ok(token)
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub provider_subject: String,
  pub email:            String,
  pub username:         String,
}

/// `POST /auth/register` — body: `{"provider_subject":..., "email":...,
/// "username":...}`.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  verify_provider(&headers, &state.provider)?;

  if body.provider_subject.trim().is_empty() || body.email.trim().is_empty() {
    return Err(ApiError::BadRequest("required fields missing".into()));
  }
  let username = validate_username(&body.username)?;

  let user = state
    .store
    .create_user(NewUser {
      provider_subject: body.provider_subject.trim().to_owned(),
      email:            body.email.trim().to_owned(),
      username,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = %user.user_id, handle = %user.display_handle, "registered user");

  let token = issue_session(state.store.as_ref(), user.user_id).await?;
  Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub provider_subject: String,
}

/// `POST /auth/login` — 404 if the identity has no account yet, which routes
/// the client to username setup.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<LoginBody>,
) -> Result<Json<AuthResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  verify_provider(&headers, &state.provider)?;

  let user = state
    .store
    .find_user_by_provider_subject(body.provider_subject.trim())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("no account for this identity".into()))?;

  let token = issue_session(state.store.as_ref(), user.user_id).await?;
  Ok(Json(AuthResponse { user, token }))
}
