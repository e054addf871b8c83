//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields (image
//! lists, metadata values, metadata-field schemas) are stored as compact
//! JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use revibako_core::{
  group::{Category, EvaluationCriterion, MemberProfile, MemberRole,
    MetadataField, ReviewGroup},
  invitation::InvitationStatus,
  review::{Review, ReviewAuthor},
  subject::{MetadataValues, ReviewSubject},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── MemberRole
// ───────────────────────────────────────────────────────────────

pub fn encode_role(r: MemberRole) -> &'static str {
  match r {
    MemberRole::Owner => "owner",
    MemberRole::Admin => "admin",
    MemberRole::Member => "member",
  }
}

pub fn decode_role(s: &str) -> Result<MemberRole> {
  match s {
    "owner" => Ok(MemberRole::Owner),
    "admin" => Ok(MemberRole::Admin),
    "member" => Ok(MemberRole::Member),
    other => Err(Error::DateParse(format!("unknown member role: {other:?}"))),
  }
}

// ─── InvitationStatus
// ─────────────────────────────────────────────────────────

pub fn encode_invitation_status(s: InvitationStatus) -> &'static str {
  match s {
    InvitationStatus::Pending => "pending",
    InvitationStatus::Accepted => "accepted",
    InvitationStatus::Declined => "declined",
  }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_string_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_string_list(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_metadata(values: &MetadataValues) -> Result<String> {
  Ok(serde_json::to_string(values)?)
}

pub fn decode_metadata(s: &str) -> Result<MetadataValues> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_metadata_fields(fields: &[MetadataField]) -> Result<String> {
  Ok(serde_json::to_string(fields)?)
}

pub fn decode_metadata_fields(s: &str) -> Result<Vec<MetadataField>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:          String,
  pub provider_subject: String,
  pub email:            String,
  pub username:         String,
  pub display_handle:   String,
  pub avatar_url:       Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, provider_subject, email, \
     username, display_handle, avatar_url, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:          row.get(0)?,
      provider_subject: row.get(1)?,
      email:            row.get(2)?,
      username:         row.get(3)?,
      display_handle:   row.get(4)?,
      avatar_url:       row.get(5)?,
      created_at:       row.get(6)?,
      updated_at:       row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:          decode_uuid(&self.user_id)?,
      provider_subject: self.provider_subject,
      email:            self.email,
      username:         self.username,
      display_handle:   self.display_handle,
      avatar_url:       self.avatar_url,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `categories` row.
pub struct RawCategory {
  pub category_id: String,
  pub name:        String,
  pub icon:        String,
  pub order_index: i64,
}

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id: row.get(0)?,
      name:        row.get(1)?,
      icon:        row.get(2)?,
      order_index: row.get(3)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      category_id: decode_uuid(&self.category_id)?,
      name:        self.name,
      icon:        self.icon,
      order_index: self.order_index,
    })
  }
}

/// Raw strings read directly from a `review_groups` row.
pub struct RawGroup {
  pub group_id:        String,
  pub name:            String,
  pub description:     Option<String>,
  pub category_id:     String,
  pub is_private:      bool,
  pub image_url:       Option<String>,
  pub metadata_fields: String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawGroup {
  pub const COLUMNS: &'static str = "group_id, name, description, \
     category_id, is_private, image_url, metadata_fields, created_at, \
     updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:        row.get(0)?,
      name:            row.get(1)?,
      description:     row.get(2)?,
      category_id:     row.get(3)?,
      is_private:      row.get(4)?,
      image_url:       row.get(5)?,
      metadata_fields: row.get(6)?,
      created_at:      row.get(7)?,
      updated_at:      row.get(8)?,
    })
  }

  pub fn into_group(self) -> Result<ReviewGroup> {
    Ok(ReviewGroup {
      group_id:        decode_uuid(&self.group_id)?,
      name:            self.name,
      description:     self.description,
      category_id:     decode_uuid(&self.category_id)?,
      is_private:      self.is_private,
      image_url:       self.image_url,
      metadata_fields: decode_metadata_fields(&self.metadata_fields)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `evaluation_criteria` row.
pub struct RawCriterion {
  pub criterion_id: String,
  pub group_id:     String,
  pub name:         String,
  pub order_index:  i64,
}

impl RawCriterion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      criterion_id: row.get(0)?,
      group_id:     row.get(1)?,
      name:         row.get(2)?,
      order_index:  row.get(3)?,
    })
  }

  pub fn into_criterion(self) -> Result<EvaluationCriterion> {
    Ok(EvaluationCriterion {
      criterion_id: decode_uuid(&self.criterion_id)?,
      group_id:     decode_uuid(&self.group_id)?,
      name:         self.name,
      order_index:  self.order_index,
    })
  }
}

/// A `review_group_members` row joined with the member's profile columns.
pub struct RawMemberProfile {
  pub user_id:        String,
  pub username:       String,
  pub display_handle: String,
  pub avatar_url:     Option<String>,
  pub role:           String,
  pub joined_at:      String,
}

impl RawMemberProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(0)?,
      username:       row.get(1)?,
      display_handle: row.get(2)?,
      avatar_url:     row.get(3)?,
      role:           row.get(4)?,
      joined_at:      row.get(5)?,
    })
  }

  pub fn into_profile(self) -> Result<MemberProfile> {
    Ok(MemberProfile {
      user_id:        decode_uuid(&self.user_id)?,
      username:       self.username,
      display_handle: self.display_handle,
      avatar_url:     self.avatar_url,
      role:           decode_role(&self.role)?,
      joined_at:      decode_dt(&self.joined_at)?,
    })
  }
}

/// Raw strings read directly from a `review_subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub group_id:   String,
  pub name:       String,
  pub images:     String,
  pub metadata:   String,
  pub created_by: String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawSubject {
  pub const COLUMNS: &'static str = "subject_id, group_id, name, images, \
     metadata, created_by, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      group_id:   row.get(1)?,
      name:       row.get(2)?,
      images:     row.get(3)?,
      metadata:   row.get(4)?,
      created_by: row.get(5)?,
      created_at: row.get(6)?,
      updated_at: row.get(7)?,
    })
  }

  pub fn into_subject(self) -> Result<ReviewSubject> {
    Ok(ReviewSubject {
      subject_id: decode_uuid(&self.subject_id)?,
      group_id:   decode_uuid(&self.group_id)?,
      name:       self.name,
      images:     decode_string_list(&self.images)?,
      metadata:   decode_metadata(&self.metadata)?,
      created_by: decode_uuid(&self.created_by)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `reviews` row.
pub struct RawReview {
  pub review_id:   String,
  pub subject_id:  String,
  pub user_id:     String,
  pub comment:     Option<String>,
  pub images:      String,
  pub total_score: f64,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawReview {
  pub const COLUMNS: &'static str = "review_id, subject_id, user_id, \
     comment, images, total_score, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:   row.get(0)?,
      subject_id:  row.get(1)?,
      user_id:     row.get(2)?,
      comment:     row.get(3)?,
      images:      row.get(4)?,
      total_score: row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:   decode_uuid(&self.review_id)?,
      subject_id:  decode_uuid(&self.subject_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      comment:     self.comment,
      images:      decode_string_list(&self.images)?,
      total_score: self.total_score,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// A `reviews` row joined with the author's profile columns.
pub struct RawReviewAuthor {
  pub user_id:        String,
  pub username:       String,
  pub display_handle: String,
  pub avatar_url:     Option<String>,
}

impl RawReviewAuthor {
  pub fn into_author(self) -> Result<ReviewAuthor> {
    Ok(ReviewAuthor {
      user_id:        decode_uuid(&self.user_id)?,
      username:       self.username,
      display_handle: self.display_handle,
      avatar_url:     self.avatar_url,
    })
  }
}

