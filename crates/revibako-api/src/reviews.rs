//! Handlers for the review endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `.../subjects/:sid/reviews` | All active reviews |
//! | `POST` | `.../subjects/:sid/reviews` | One per (user, subject) |
//! | `GET`  | `.../subjects/:sid/reviews/edit` | The caller's own review |
//! | `PUT`  | `.../subjects/:sid/reviews/edit` | Replaces all score rows |
//! | `DELETE` | `.../subjects/:sid/reviews/edit` | Scores removed physically |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use revibako_core::{
  group::EvaluationCriterion,
  review::{
    NewReview, Review, ReviewUpdate, ReviewWithAuthor, ScoredReview,
  },
  store::ReviewStore,
  subject::ReviewSubject,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentUser, require_member},
  error::ApiError,
};

/// 404 unless the subject exists inside the group named in the path; stops a
/// member of one group reaching another group's reviews by subject id.
async fn require_subject<S>(
  store: &S,
  group_id: Uuid,
  subject_id: Uuid,
) -> Result<(), ApiError>
where
  S: ReviewStore,
{
  store
    .get_subject(group_id, subject_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("review subject {subject_id} not found"))
    })?;
  Ok(())
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
  pub reviews: Vec<ReviewWithAuthor>,
}

/// `GET .../subjects/:sid/reviews` — newest first, with author profiles and
/// named scores.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path((group_id, subject_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ReviewsResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;
  require_subject(state.store.as_ref(), group_id, subject_id).await?;

  let reviews = state
    .store
    .list_reviews(subject_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ReviewsResponse { reviews }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub comment: Option<String>,
  #[serde(default)]
  pub images:  Vec<String>,
  /// Star ratings keyed by criterion id; every group criterion is required.
  pub scores:  BTreeMap<Uuid, u8>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
  pub review: Review,
}

/// `POST .../subjects/:sid/reviews` — 409 if the caller already reviewed
/// this subject.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path((group_id, subject_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ReviewBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;
  require_subject(state.store.as_ref(), group_id, subject_id).await?;

  let review = state
    .store
    .create_review(NewReview {
      subject_id,
      user_id: user.user_id,
      comment: body.comment.filter(|c| !c.trim().is_empty()),
      images: body.images,
      scores: body.scores,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::debug!(review_id = %review.review_id, total = review.total_score, "recorded review");

  Ok((StatusCode::CREATED, Json(ReviewResponse { review })))
}

// ─── Own review ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct OwnReviewResponse {
  pub review:   ScoredReview,
  pub criteria: Vec<EvaluationCriterion>,
  pub subject:  ReviewSubject,
}

/// `GET .../subjects/:sid/reviews/edit` — everything the edit form needs.
pub async fn get_own<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path((group_id, subject_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OwnReviewResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let review = state
    .store
    .get_user_review(subject_id, user.user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("review not found".into()))?;

  let criteria = state
    .store
    .group_criteria(group_id)
    .await
    .map_err(ApiError::store)?;

  let subject = state
    .store
    .get_subject(group_id, subject_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("review subject {subject_id} not found"))
    })?;

  Ok(Json(OwnReviewResponse { review, criteria, subject }))
}

/// `PUT .../subjects/:sid/reviews/edit` — same validation as create.
pub async fn update_own<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path((group_id, subject_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<ReviewResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;
  require_subject(state.store.as_ref(), group_id, subject_id).await?;

  let review = state
    .store
    .update_review(subject_id, user.user_id, ReviewUpdate {
      comment: body.comment.filter(|c| !c.trim().is_empty()),
      images:  body.images,
      scores:  body.scores,
    })
    .await
    .map_err(ApiError::store)?;

  Ok(Json(ReviewResponse { review }))
}

/// `DELETE .../subjects/:sid/reviews/edit`
pub async fn delete_own<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path((group_id, subject_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;
  require_subject(state.store.as_ref(), group_id, subject_id).await?;

  state
    .store
    .delete_review(subject_id, user.user_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(json!({ "message": "review deleted" })))
}
