//! User identity.
//!
//! Authentication itself is delegated to an external OAuth provider; a user
//! row binds that provider identity (`provider_subject`) to a profile and a
//! numeric display handle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const USERNAME_MIN: usize = 1;
pub const USERNAME_MAX: usize = 10;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:          Uuid,
  /// The OAuth `sub` claim; never exposed to other users.
  #[serde(skip_serializing)]
  pub provider_subject: String,
  pub email:            String,
  pub username:         String,
  /// Numeric handle other members use to address this user.
  pub display_handle:   String,
  pub avatar_url:       Option<String>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`crate::store::ReviewStore::create_user`].
/// The store assigns the id, the display handle, and both timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub provider_subject: String,
  pub email:            String,
  pub username:         String,
}

/// Input to [`crate::store::ReviewStore::update_profile`].
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
  pub username:   String,
  pub avatar_url: Option<String>,
}

/// Trim and length-check a username.
pub fn validate_username(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let len = trimmed.chars().count();
  if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
    return Err(Error::Validation(format!(
      "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
    )));
  }
  Ok(trimmed.to_owned())
}
