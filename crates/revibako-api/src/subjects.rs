//! Handlers for the review-subject endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/review-groups/:id/subjects` | With review aggregates |
//! | `POST` | `/review-groups/:id/subjects` | Any member |
//! | `GET`  | `/review-groups/:id/subjects/:sid` | Detail + score breakdown |
//! | `PUT`  | `/review-groups/:id/subjects/:sid/edit` | Owner/admin/creator |
//! | `DELETE` | `/review-groups/:id/subjects/:sid/edit` | Blocked while reviewed |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use revibako_core::{
  group::{EvaluationCriterion, MemberRole},
  store::ReviewStore,
  subject::{
    MetadataValues, NewSubject, ReviewSubject, SubjectDetail, SubjectSummary,
    SubjectUpdate, validate_subject_name,
  },
  user::User,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentUser, require_member},
  error::ApiError,
};

/// Owner, admin, or the subject's original creator.
fn may_edit(role: MemberRole, subject: &ReviewSubject, user: &User) -> bool {
  role.can_moderate() || subject.created_by == user.user_id
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubjectsResponse {
  pub subjects: Vec<SubjectSummary>,
}

/// `GET /review-groups/:id/subjects` — newest first, with aggregates.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(group_id): Path<Uuid>,
) -> Result<Json<SubjectsResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let subjects = state
    .store
    .list_subjects(group_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(SubjectsResponse { subjects }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:     String,
  #[serde(default)]
  pub images:   Vec<String>,
  /// Values keyed by the group's metadata-field schema; not validated
  /// against it.
  #[serde(default)]
  pub metadata: MetadataValues,
}

#[derive(Debug, Serialize)]
pub struct SubjectResponse {
  pub subject: ReviewSubject,
}

/// `POST /review-groups/:id/subjects`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(group_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let name = validate_subject_name(&body.name)?;

  let subject = state
    .store
    .create_subject(NewSubject {
      group_id,
      name,
      images: body.images,
      metadata: body.metadata,
      created_by: user.user_id,
    })
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(SubjectResponse { subject })))
}

// ─── Detail ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubjectDetailResponse {
  #[serde(flatten)]
  pub detail:    SubjectDetail,
  pub criteria:  Vec<EvaluationCriterion>,
  pub user_role: MemberRole,
}

/// `GET /review-groups/:id/subjects/:sid` — aggregates plus the group's
/// criteria so the review form can render.
pub async fn detail<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path((group_id, subject_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SubjectDetailResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let user_role =
    require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let detail = state
    .store
    .subject_detail(group_id, subject_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("review subject {subject_id} not found"))
    })?;

  let criteria = state
    .store
    .group_criteria(group_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(SubjectDetailResponse { detail, criteria, user_role }))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub name:     String,
  #[serde(default)]
  pub images:   Vec<String>,
  #[serde(default)]
  pub metadata: MetadataValues,
}

/// `PUT /review-groups/:id/subjects/:sid/edit`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path((group_id, subject_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<SubjectResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let role =
    require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let subject = state
    .store
    .get_subject(group_id, subject_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("review subject {subject_id} not found"))
    })?;

  if !may_edit(role, &subject, &user) {
    return Err(ApiError::Forbidden(
      "you do not have permission to edit this subject".into(),
    ));
  }

  let name = validate_subject_name(&body.name)?;

  let subject = state
    .store
    .update_subject(subject_id, SubjectUpdate {
      name,
      images: body.images,
      metadata: body.metadata,
    })
    .await
    .map_err(ApiError::store)?;

  Ok(Json(SubjectResponse { subject }))
}

/// `DELETE /review-groups/:id/subjects/:sid/edit` — 400 while the subject
/// still has an active review.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path((group_id, subject_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let role =
    require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let subject = state
    .store
    .get_subject(group_id, subject_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("review subject {subject_id} not found"))
    })?;

  if !may_edit(role, &subject, &user) {
    return Err(ApiError::Forbidden(
      "you do not have permission to delete this subject".into(),
    ));
  }

  state
    .store
    .delete_subject(subject_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(json!({ "message": "review subject deleted" })))
}
