//! Identity extraction and the provider trust channel.
//!
//! Two verified channels exist. The OAuth bridge (the only caller allowed to
//! assert a provider subject) authenticates with HTTP Basic auth against an
//! argon2 hash from configuration. Every other endpoint requires a bearer
//! session token whose SHA-256 digest is looked up on each request — no
//! cached permission object, no ambient auth state.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::{OsRng, RngCore};
use revibako_core::{
  group::MemberRole, store::ReviewStore, user::User,
};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Provider channel ────────────────────────────────────────────────────────

/// Credentials the OAuth bridge must present on `/auth/*`.
#[derive(Clone)]
pub struct ProviderAuth {
  pub id:       String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub key_hash: String,
}

/// Verify the bridge's Basic-auth credentials directly from headers.
pub fn verify_provider(
  headers: &HeaderMap,
  config: &ProviderAuth,
) -> Result<(), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds =
    std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (id, key) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if id != config.id {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash =
    PasswordHash::new(&config.key_hash).map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(key.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(())
}

// ─── Session channel ─────────────────────────────────────────────────────────

/// Mint a fresh session token. Returns `(token, digest)`: the token goes to
/// the caller once, only the digest is persisted.
pub fn issue_token() -> (String, String) {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = hex::encode(bytes);
  let digest = token_digest(&token);
  (token, digest)
}

/// Lowercase hex SHA-256 of a bearer token.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(axum::http::header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
}

/// The authenticated caller, resolved from the bearer token on every request.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let digest = token_digest(token);

    let user = state
      .store
      .session_user(&digest)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    Ok(CurrentUser(user))
  }
}

// ─── Authorization helpers ───────────────────────────────────────────────────

/// Re-read the caller's membership and fail with 403 unless they belong to
/// the group.
pub async fn require_member<S>(
  store: &S,
  group_id: Uuid,
  user_id: Uuid,
) -> Result<MemberRole, ApiError>
where
  S: ReviewStore,
{
  store
    .membership_role(group_id, user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::Forbidden("you are not a member of this group".into())
    })
}

/// As [`require_member`], but additionally requires the `owner` role.
pub async fn require_owner<S>(
  store: &S,
  group_id: Uuid,
  user_id: Uuid,
) -> Result<(), ApiError>
where
  S: ReviewStore,
{
  let role = require_member(store, group_id, user_id).await?;
  if role != MemberRole::Owner {
    return Err(ApiError::Forbidden(
      "only the group owner can do this".into(),
    ));
  }
  Ok(())
}
