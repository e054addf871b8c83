//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every handler error serialises as `{"error": "<message>"}` with the
//! matching status code. Backend failures are logged and surfaced as a
//! generic internal error without detail leakage.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use revibako_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("authentication required")]
  Unauthorized,

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("internal server error")]
  Internal,
}

impl ApiError {
  /// Convert a store-layer error, logging anything that is not part of the
  /// domain taxonomy.
  pub fn store<E>(err: E) -> Self
  where
    E: Into<CoreError>,
  {
    Self::from(err.into())
  }
}

impl From<CoreError> for ApiError {
  fn from(err: CoreError) -> Self {
    match err {
      CoreError::Validation(_)
      | CoreError::CategoryNotFound(_)
      | CoreError::SubjectHasReviews => Self::BadRequest(err.to_string()),

      CoreError::AccessDenied(msg) => Self::Forbidden(msg),

      CoreError::UserNotFound(_)
      | CoreError::HandleNotFound(_)
      | CoreError::GroupNotFound(_)
      | CoreError::SubjectNotFound(_)
      | CoreError::ReviewNotFound => Self::NotFound(err.to_string()),

      CoreError::IdentityTaken
      | CoreError::AlreadyMember
      | CoreError::AlreadyInvited
      | CoreError::AlreadyReviewed => Self::Conflict(err.to_string()),

      CoreError::HandleSpaceExhausted
      | CoreError::Storage(_)
      | CoreError::Serialization(_) => {
        tracing::error!(error = %err, "store failure");
        Self::Internal
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
