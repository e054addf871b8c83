//! Sessions — the verified identity channel.
//!
//! Handlers never accept a caller-supplied user id. A session is issued at
//! registration or login and presented as an opaque bearer token; only the
//! SHA-256 digest of the token is ever persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long an issued session stays valid.
pub fn session_ttl() -> chrono::Duration {
  chrono::Duration::days(30)
}

/// A persisted session. The plaintext token is returned to the caller exactly
/// once and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub session_id:   Uuid,
  pub user_id:      Uuid,
  /// Lowercase hex SHA-256 of the bearer token.
  pub token_digest: String,
  pub created_at:   DateTime<Utc>,
  pub expires_at:   DateTime<Utc>,
}

/// Input to [`crate::store::ReviewStore::create_session`].
#[derive(Debug, Clone)]
pub struct NewSession {
  pub user_id:      Uuid,
  pub token_digest: String,
  pub expires_at:   DateTime<Utc>,
}
