//! Reviews and per-criterion evaluation scores.
//!
//! A user leaves at most one active review per subject. Every criterion the
//! group defines must be scored, each score an integer star rating in
//! [`MIN_SCORE`]..=[`MAX_SCORE`]; the review's total score is the unweighted
//! mean of those scores, rounded to two decimals.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, group::EvaluationCriterion};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

// ─── Review ──────────────────────────────────────────────────────────────────

/// A review of one subject by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  pub review_id:   Uuid,
  pub subject_id:  Uuid,
  pub user_id:     Uuid,
  pub comment:     Option<String>,
  pub images:      Vec<String>,
  /// Mean of the per-criterion scores, rounded to 2 decimals. Derived;
  /// recomputed on every edit.
  pub total_score: f64,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// A per-criterion score joined with the criterion's name for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedScore {
  pub criterion_id: Uuid,
  pub name:         String,
  pub score:        u8,
}

/// A review with its scores — the shape the edit page loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredReview {
  pub review: Review,
  pub scores: Vec<NamedScore>,
}

/// Public profile of a review's author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAuthor {
  pub user_id:        Uuid,
  pub username:       String,
  pub display_handle: String,
  pub avatar_url:     Option<String>,
}

/// One entry of a subject's review list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewWithAuthor {
  pub review: Review,
  pub author: ReviewAuthor,
  pub scores: Vec<NamedScore>,
}

/// Input to [`crate::store::ReviewStore::create_review`]. Scores are keyed
/// by criterion id; the store validates them against the group's criteria and
/// derives the total.
#[derive(Debug, Clone)]
pub struct NewReview {
  pub subject_id: Uuid,
  pub user_id:    Uuid,
  pub comment:    Option<String>,
  pub images:     Vec<String>,
  pub scores:     BTreeMap<Uuid, u8>,
}

/// Input to [`crate::store::ReviewStore::update_review`]. Score rows are
/// replaced wholesale (delete-then-insert), never upserted.
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
  pub comment: Option<String>,
  pub images:  Vec<String>,
  pub scores:  BTreeMap<Uuid, u8>,
}

// ─── Score validation ────────────────────────────────────────────────────────

/// Round to two decimal places, the precision `total_score` is stored at.
pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

/// Validate a score map against a group's criteria and return the derived
/// total score.
///
/// Every criterion must be scored, no unknown criterion may appear, and each
/// score must lie in [`MIN_SCORE`]..=[`MAX_SCORE`].
pub fn validate_scores(
  criteria: &[EvaluationCriterion],
  scores: &BTreeMap<Uuid, u8>,
) -> Result<f64> {
  if scores.is_empty() {
    return Err(Error::Validation("scores required".into()));
  }

  for id in scores.keys() {
    if !criteria.iter().any(|c| c.criterion_id == *id) {
      return Err(Error::Validation(format!("invalid criterion id: {id}")));
    }
  }

  for criterion in criteria {
    let Some(score) = scores.get(&criterion.criterion_id) else {
      return Err(Error::Validation(format!(
        "missing score for criterion {:?}",
        criterion.name
      )));
    };
    if !(MIN_SCORE..=MAX_SCORE).contains(score) {
      return Err(Error::Validation(format!(
        "score for {:?} must be between {MIN_SCORE} and {MAX_SCORE}",
        criterion.name
      )));
    }
  }

  let sum: u32 = scores.values().map(|&s| u32::from(s)).sum();
  Ok(round2(f64::from(sum) / scores.len() as f64))
}
