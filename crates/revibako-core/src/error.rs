//! Error types for `revibako-core`.
//!
//! This is the full domain taxonomy; storage backends wrap it and the HTTP
//! layer maps each variant to a status code.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Validation(String),

  #[error("access denied: {0}")]
  AccessDenied(String),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("no user with display handle {0:?}")]
  HandleNotFound(String),

  #[error("invalid category: {0}")]
  CategoryNotFound(Uuid),

  #[error("review group not found: {0}")]
  GroupNotFound(Uuid),

  #[error("review subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("review not found")]
  ReviewNotFound,

  #[error("this identity is already registered")]
  IdentityTaken,

  #[error("this user is already a member of the group")]
  AlreadyMember,

  #[error("this user already has a pending invitation to the group")]
  AlreadyInvited,

  #[error("you have already reviewed this subject")]
  AlreadyReviewed,

  #[error("cannot delete a subject that has reviews")]
  SubjectHasReviews,

  /// Both the 6-digit and the widened handle space ran out of attempts.
  #[error("could not allocate a unique display handle")]
  HandleSpaceExhausted,

  #[error("storage error: {0}")]
  Storage(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
