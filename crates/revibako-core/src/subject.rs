//! Review subjects — the things a group reviews.
//!
//! A subject belongs to one group and carries an image list plus metadata
//! values keyed by the group's metadata-field schema. Aggregate statistics
//! (review count, mean scores) are computed on read, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const SUBJECT_NAME_MAX: usize = 200;

/// Metadata values, keyed by the group's field schema. Conformance to the
/// schema is not enforced server-side.
pub type MetadataValues = serde_json::Map<String, serde_json::Value>;

/// A review subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubject {
  pub subject_id: Uuid,
  pub group_id:   Uuid,
  pub name:       String,
  pub images:     Vec<String>,
  pub metadata:   MetadataValues,
  pub created_by: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::ReviewStore::create_subject`].
#[derive(Debug, Clone)]
pub struct NewSubject {
  pub group_id:   Uuid,
  pub name:       String,
  pub images:     Vec<String>,
  pub metadata:   MetadataValues,
  pub created_by: Uuid,
}

/// Input to [`crate::store::ReviewStore::update_subject`].
#[derive(Debug, Clone)]
pub struct SubjectUpdate {
  pub name:     String,
  pub images:   Vec<String>,
  pub metadata: MetadataValues,
}

/// The newest review of a subject, shown on list pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestReview {
  pub comment:     Option<String>,
  pub total_score: f64,
  pub created_at:  DateTime<Utc>,
  pub username:    String,
}

/// A subject with the aggregates shown on the group page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSummary {
  pub subject:       ReviewSubject,
  pub review_count:  i64,
  /// Mean of review total scores; `0.0` while unreviewed.
  pub average_score: f64,
  pub latest_review: Option<LatestReview>,
}

/// Mean score for one criterion across all active reviews of a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionAverage {
  pub criterion_id:  Uuid,
  pub name:          String,
  pub average_score: f64,
}

/// The full read model for a subject page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectDetail {
  pub subject:         ReviewSubject,
  pub review_count:    i64,
  pub average_score:   f64,
  pub score_breakdown: Vec<CriterionAverage>,
}

/// Trim and length-check a subject name.
pub fn validate_subject_name(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let len = trimmed.chars().count();
  if len == 0 || len > SUBJECT_NAME_MAX {
    return Err(Error::Validation(format!(
      "subject name must be 1-{SUBJECT_NAME_MAX} characters"
    )));
  }
  Ok(trimmed.to_owned())
}
