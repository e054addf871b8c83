//! Handlers for the `/review-groups` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/review-groups` | The caller's groups |
//! | `POST` | `/review-groups` | Create group + owner membership + criteria |
//! | `GET`  | `/review-groups/:id` | Member-only detail |
//! | `PUT`  | `/review-groups/:id/settings` | Owner-only |
//! | `DELETE` | `/review-groups/:id/settings` | Owner-only cascade |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use revibako_core::{
  group::{
    GroupDetail, GroupMembership, GroupSettingsUpdate, MemberRole,
    MetadataField, NewReviewGroup, ReviewGroup, validate_criteria,
    validate_description, validate_group_name,
  },
  store::ReviewStore,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentUser, require_member, require_owner},
  error::ApiError,
};

fn default_private() -> bool { true }

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:                String,
  pub description:         Option<String>,
  pub category_id:         Uuid,
  /// Groups are private unless explicitly opened up.
  #[serde(default = "default_private")]
  pub is_private:          bool,
  pub image_url:           Option<String>,
  #[serde(default)]
  pub metadata_fields:     Vec<MetadataField>,
  pub evaluation_criteria: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
  pub group: ReviewGroup,
}

/// `POST /review-groups`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let name = validate_group_name(&body.name)?;
  let description = validate_description(body.description.as_deref())?;
  let criteria = validate_criteria(body.evaluation_criteria)?;

  let group = state
    .store
    .create_group(NewReviewGroup {
      name,
      description,
      category_id: body.category_id,
      is_private: body.is_private,
      image_url: body.image_url,
      metadata_fields: body.metadata_fields,
      criteria,
      owner_id: user.user_id,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(group_id = %group.group_id, owner = %user.user_id, "created review group");

  Ok((StatusCode::CREATED, Json(GroupResponse { group })))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GroupListResponse {
  pub review_groups: Vec<GroupMembership>,
}

/// `GET /review-groups` — groups the caller belongs to, newest join first.
pub async fn list_mine<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<GroupListResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let review_groups = state
    .store
    .groups_for_user(user.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(GroupListResponse { review_groups }))
}

// ─── Detail ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GroupDetailResponse {
  #[serde(flatten)]
  pub detail:    GroupDetail,
  pub user_role: MemberRole,
}

/// `GET /review-groups/:id` — 403 for non-members, 404 for deleted groups.
pub async fn detail<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(group_id): Path<Uuid>,
) -> Result<Json<GroupDetailResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let user_role =
    require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let detail = state
    .store
    .group_detail(group_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("group {group_id} not found")))?;

  Ok(Json(GroupDetailResponse { detail, user_role }))
}

// ─── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SettingsBody {
  pub name:        String,
  pub description: Option<String>,
  #[serde(default = "default_private")]
  pub is_private:  bool,
  pub image_url:   Option<String>,
}

/// `PUT /review-groups/:id/settings` — owner only.
pub async fn update_settings<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(group_id): Path<Uuid>,
  Json(body): Json<SettingsBody>,
) -> Result<Json<GroupResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_owner(state.store.as_ref(), group_id, user.user_id).await?;

  let name = validate_group_name(&body.name)?;
  let description = validate_description(body.description.as_deref())?;

  let group = state
    .store
    .update_group(group_id, GroupSettingsUpdate {
      name,
      description,
      is_private: body.is_private,
      image_url: body.image_url,
    })
    .await
    .map_err(ApiError::store)?;

  Ok(Json(GroupResponse { group }))
}

/// `DELETE /review-groups/:id/settings` — owner only; cascades.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(group_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_owner(state.store.as_ref(), group_id, user.user_id).await?;

  let cascade = state
    .store
    .delete_group(group_id)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    group_id = %group_id,
    memberships = cascade.memberships,
    subjects = cascade.subjects,
    reviews = cascade.reviews,
    scores = cascade.scores,
    "deleted review group"
  );

  Ok(Json(json!({ "message": "group deleted" })))
}
