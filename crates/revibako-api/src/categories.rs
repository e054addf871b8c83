//! Handler for `GET /categories`.

use axum::{Json, extract::State};
use revibako_core::{group::Category, store::ReviewStore};
use serde::Serialize;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
  pub categories: Vec<Category>,
}

/// `GET /categories` — the fixed taxonomy, in display order.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_user): CurrentUser,
) -> Result<Json<CategoriesResponse>, ApiError>
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  let categories = state
    .store
    .list_categories()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(CategoriesResponse { categories }))
}
