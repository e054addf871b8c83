//! Handlers for group membership and invitations.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/review-groups/:id/members` | Member-only |
//! | `POST` | `/review-groups/:id/members/invite` | Member-only; by handle |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use revibako_core::{
  group::MemberProfile,
  handle::is_valid_handle,
  invitation::{Invitation, NewInvitation},
  store::ReviewStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentUser, require_member},
  error::ApiError,
};

#[derive(Debug, Serialize)]
pub struct MembersResponse {
  pub members: Vec<MemberProfile>,
}

/// `GET /review-groups/:id/members` — oldest join first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(group_id): Path<Uuid>,
) -> Result<Json<MembersResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let members = state
    .store
    .list_members(group_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(MembersResponse { members }))
}

#[derive(Debug, Deserialize)]
pub struct InviteBody {
  pub display_handle: String,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
  pub invitation: Invitation,
}

/// `POST /review-groups/:id/members/invite` — records a pending invitation.
/// 409 with distinct messages for an existing member vs. a duplicate
/// pending invitation.
pub async fn invite<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(group_id): Path<Uuid>,
  Json(body): Json<InviteBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  require_member(state.store.as_ref(), group_id, user.user_id).await?;

  let handle = body.display_handle.trim();
  if !is_valid_handle(handle) {
    return Err(ApiError::BadRequest("invalid display handle".into()));
  }

  let invitation = state
    .store
    .create_invitation(NewInvitation {
      group_id,
      inviter_id: user.user_id,
      invited_handle: handle.to_owned(),
    })
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(InviteResponse { invitation })))
}
