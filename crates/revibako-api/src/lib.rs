//! JSON REST API for Review Box.
//!
//! Exposes an axum [`Router`] backed by any
//! [`revibako_core::store::ReviewStore`]. Identity is never taken from the
//! request body: the registration endpoints authenticate the external OAuth
//! bridge with Basic auth, everything else requires a bearer session token.
//!
//! # Mounting
//!
//! ```rust,ignore
//! axum::serve(listener, revibako_api::api_router(state)).await?;
//! ```

pub mod auth;
pub mod categories;
pub mod error;
pub mod groups;
pub mod members;
pub mod profile;
pub mod registration;
pub mod reviews;
pub mod subjects;
pub mod upload;


use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use revibako_core::store::ReviewStore;
use serde::Deserialize;

use auth::ProviderAuth;
pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Directory uploaded images are written to.
  pub image_dir:         PathBuf,
  /// Public base URL the image directory is served under.
  pub image_base_url:    String,
  /// Basic-auth id the OAuth bridge authenticates with.
  pub provider_id:       String,
  /// Argon2 PHC hash of the OAuth bridge's key.
  pub provider_key_hash: String,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ReviewStore> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub provider: Arc<ProviderAuth>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn api_router<S>(state: AppState<S>) -> Router
where
  S: ReviewStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Registration & identity
    .route("/auth/register", post(registration::register::<S>))
    .route("/auth/login", post(registration::login::<S>))
    .route(
      "/user/profile",
      get(profile::get_own::<S>).put(profile::update_own::<S>),
    )
    // Reference data
    .route("/categories", get(categories::list::<S>))
    // Review groups
    .route(
      "/review-groups",
      get(groups::list_mine::<S>).post(groups::create::<S>),
    )
    .route("/review-groups/{group_id}", get(groups::detail::<S>))
    .route(
      "/review-groups/{group_id}/settings",
      put(groups::update_settings::<S>).delete(groups::delete::<S>),
    )
    // Membership
    .route("/review-groups/{group_id}/members", get(members::list::<S>))
    .route(
      "/review-groups/{group_id}/members/invite",
      post(members::invite::<S>),
    )
    // Subjects
    .route(
      "/review-groups/{group_id}/subjects",
      get(subjects::list::<S>).post(subjects::create::<S>),
    )
    .route(
      "/review-groups/{group_id}/subjects/{subject_id}",
      get(subjects::detail::<S>),
    )
    .route(
      "/review-groups/{group_id}/subjects/{subject_id}/edit",
      put(subjects::update::<S>).delete(subjects::delete::<S>),
    )
    // Reviews
    .route(
      "/review-groups/{group_id}/subjects/{subject_id}/reviews",
      get(reviews::list::<S>).post(reviews::create::<S>),
    )
    .route(
      "/review-groups/{group_id}/subjects/{subject_id}/reviews/edit",
      get(reviews::get_own::<S>)
        .put(reviews::update_own::<S>)
        .delete(reviews::delete_own::<S>),
    )
    // Images
    .route("/upload/image", post(upload::image::<S>))
    .with_state(state)
}
