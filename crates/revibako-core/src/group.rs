//! Review groups, memberships, and evaluation criteria.
//!
//! A group is a private (or public) circle built around one category, with a
//! set of evaluation criteria fixed at creation and an optional free-form
//! metadata-field schema that subjects in the group may fill in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const GROUP_NAME_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;

// ─── Categories ──────────────────────────────────────────────────────────────

/// A fixed taxonomy entry. Reference data, seeded at schema initialisation
/// and never user-mutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
  pub icon:        String,
  pub order_index: i64,
}

// ─── Membership ──────────────────────────────────────────────────────────────

/// Role of a user within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
  Owner,
  Admin,
  Member,
}

impl MemberRole {
  /// Owners and admins may edit or delete subjects they did not create.
  pub fn can_moderate(self) -> bool {
    matches!(self, Self::Owner | Self::Admin)
  }
}

/// A member of a group, joined with their public profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
  pub user_id:        Uuid,
  pub username:       String,
  pub display_handle: String,
  pub avatar_url:     Option<String>,
  pub role:           MemberRole,
  pub joined_at:      DateTime<Utc>,
}

// ─── Metadata-field schema ───────────────────────────────────────────────────

/// Value type of a metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  Text,
  Number,
  Date,
  Select,
}

/// One entry of a group's free-form metadata schema. Subjects store values
/// keyed by `key`; conformance is not enforced server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataField {
  pub key:        String,
  pub label:      String,
  #[serde(rename = "type")]
  pub field_type: FieldType,
  #[serde(default)]
  pub options:    Vec<String>,
  #[serde(default)]
  pub required:   bool,
}

// ─── Groups ──────────────────────────────────────────────────────────────────

/// A review group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewGroup {
  pub group_id:        Uuid,
  pub name:            String,
  pub description:     Option<String>,
  pub category_id:     Uuid,
  pub is_private:      bool,
  pub image_url:       Option<String>,
  pub metadata_fields: Vec<MetadataField>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// An evaluation criterion, scoped to a group. Criteria are fixed at group
/// creation and never altered or removed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationCriterion {
  pub criterion_id: Uuid,
  pub group_id:     Uuid,
  pub name:         String,
  pub order_index:  i64,
}

/// Input to [`crate::store::ReviewStore::create_group`]. The group, the
/// owner's membership, and the criteria are created in one transaction.
#[derive(Debug, Clone)]
pub struct NewReviewGroup {
  pub name:            String,
  pub description:     Option<String>,
  pub category_id:     Uuid,
  pub is_private:      bool,
  pub image_url:       Option<String>,
  pub metadata_fields: Vec<MetadataField>,
  /// Criterion names in display order; blank entries already dropped.
  pub criteria:        Vec<String>,
  pub owner_id:        Uuid,
}

/// Input to [`crate::store::ReviewStore::update_group`].
#[derive(Debug, Clone)]
pub struct GroupSettingsUpdate {
  pub name:        String,
  pub description: Option<String>,
  pub is_private:  bool,
  pub image_url:   Option<String>,
}

/// One row of the caller's group list: the group joined with its category
/// and the caller's own membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembership {
  pub group:     ReviewGroup,
  pub category:  Category,
  pub role:      MemberRole,
  pub joined_at: DateTime<Utc>,
}

/// The full read model for a group page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDetail {
  pub group:        ReviewGroup,
  pub category:     Category,
  /// Live count of non-deleted memberships.
  pub member_count: i64,
  pub criteria:     Vec<EvaluationCriterion>,
}

/// Row counts touched by a group deletion cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCascade {
  pub memberships: usize,
  pub criteria:    usize,
  pub subjects:    usize,
  pub reviews:     usize,
  /// Evaluation scores are removed physically, not soft-deleted.
  pub scores:      usize,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Trim and length-check a group name.
pub fn validate_group_name(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let len = trimmed.chars().count();
  if len == 0 || len > GROUP_NAME_MAX {
    return Err(Error::Validation(format!(
      "group name must be 1-{GROUP_NAME_MAX} characters"
    )));
  }
  Ok(trimmed.to_owned())
}

/// Trim an optional description, mapping blank to `None`.
pub fn validate_description(raw: Option<&str>) -> Result<Option<String>> {
  let Some(raw) = raw else { return Ok(None) };
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }
  if trimmed.chars().count() > DESCRIPTION_MAX {
    return Err(Error::Validation(format!(
      "description must be {DESCRIPTION_MAX} characters or less"
    )));
  }
  Ok(Some(trimmed.to_owned()))
}

/// Drop blank criterion names, keeping submission order; at least one must
/// survive.
pub fn validate_criteria(raw: Vec<String>) -> Result<Vec<String>> {
  let names: Vec<String> = raw
    .into_iter()
    .map(|n| n.trim().to_owned())
    .filter(|n| !n.is_empty())
    .collect();
  if names.is_empty() {
    return Err(Error::Validation(
      "at least one evaluation criterion is required".into(),
    ));
  }
  Ok(names)
}
