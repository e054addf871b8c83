//! [`SqliteStore`] — the SQLite implementation of [`ReviewStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use rusqlite::{OptionalExtension as _, params};
use uuid::Uuid;

use revibako_core::{
  Error as CoreError, handle,
  group::{
    Category, EvaluationCriterion, GroupCascade, GroupDetail, GroupMembership,
    GroupSettingsUpdate, MemberProfile, MemberRole, NewReviewGroup,
    ReviewGroup,
  },
  invitation::{Invitation, InvitationStatus, NewInvitation},
  review::{
    NamedScore, NewReview, Review, ReviewUpdate, ReviewWithAuthor,
    ScoredReview, validate_scores,
  },
  session::{NewSession, Session},
  store::ReviewStore,
  subject::{
    CriterionAverage, LatestReview, NewSubject, ReviewSubject, SubjectDetail,
    SubjectSummary, SubjectUpdate,
  },
  user::{NewUser, ProfileUpdate, User},
};

use crate::{
  Error, Result,
  encode::{
    RawCategory, RawCriterion, RawGroup, RawMemberProfile,
    RawReview, RawSubject, RawUser, decode_dt, decode_uuid, encode_dt,
    encode_invitation_status, encode_metadata, encode_metadata_fields,
    encode_role, encode_string_list, encode_uuid,
  },
  schema::{SCHEMA, SEED_CATEGORIES},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Review Box store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation, and
  /// seed the category taxonomy.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  pub(crate) async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        for &(name, icon, order_index) in SEED_CATEGORIES {
          conn.execute(
            "INSERT INTO categories (category_id, name, icon, order_index)
             SELECT ?1, ?2, ?3, ?4
             WHERE NOT EXISTS (SELECT 1 FROM categories WHERE name = ?2)",
            params![
              encode_uuid(Uuid::new_v4()),
              name,
              icon,
              order_index
            ],
          )?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn handle_exists(
  conn: &rusqlite::Connection,
  handle: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM users WHERE display_handle = ?1",
        params![handle],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn get_user_row(
  conn: &rusqlite::Connection,
  sql: &str,
  key: &str,
) -> rusqlite::Result<Option<RawUser>> {
  conn.query_row(sql, params![key], RawUser::from_row).optional()
}

/// Named per-criterion scores of a review, in criterion display order.
fn review_scores(
  conn: &rusqlite::Connection,
  review_id: &str,
) -> rusqlite::Result<Vec<(String, String, u8)>> {
  let mut stmt = conn.prepare(
    "SELECT s.criterion_id, c.name, s.score
     FROM evaluation_scores s
     JOIN evaluation_criteria c ON c.criterion_id = s.criterion_id
     WHERE s.review_id = ?1
     ORDER BY c.order_index ASC",
  )?;
  let rows = stmt
    .query_map(params![review_id], |row| {
      Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn named_scores(raw: Vec<(String, String, u8)>) -> Result<Vec<NamedScore>> {
  raw
    .into_iter()
    .map(|(id, name, score)| {
      Ok(NamedScore { criterion_id: decode_uuid(&id)?, name, score })
    })
    .collect()
}

fn criteria_for_group(
  conn: &rusqlite::Connection,
  group_id: &str,
) -> rusqlite::Result<Vec<RawCriterion>> {
  let mut stmt = conn.prepare(
    "SELECT criterion_id, group_id, name, order_index
     FROM evaluation_criteria
     WHERE group_id = ?1 AND deleted_at IS NULL
     ORDER BY order_index ASC",
  )?;
  let rows = stmt
    .query_map(params![group_id], RawCriterion::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn insert_score_rows(
  conn: &rusqlite::Connection,
  review_id: &str,
  scores: &BTreeMap<Uuid, u8>,
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare(
    "INSERT INTO evaluation_scores (score_id, review_id, criterion_id, score)
     VALUES (?1, ?2, ?3, ?4)",
  )?;
  for (criterion_id, score) in scores {
    stmt.execute(params![
      encode_uuid(Uuid::new_v4()),
      review_id,
      encode_uuid(*criterion_id),
      score,
    ])?;
  }
  Ok(())
}

// ─── ReviewStore impl ────────────────────────────────────────────────────────

impl ReviewStore for SqliteStore {
  type Error = Error;

  // ── Users & sessions ──────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let now = Utc::now();
    let user_id = Uuid::new_v4();

    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(now);
    let provider_subject = input.provider_subject.clone();
    let email = input.email.clone();
    let username = input.username.clone();

    let allocated: std::result::Result<String, CoreError> = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM users WHERE provider_subject = ?1",
            params![provider_subject],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(Err(CoreError::IdentityTaken));
        }

        // Bounded allocation: try the 6-digit space, then the widened one.
        let mut rng = OsRng;
        let mut handle_str: Option<String> = None;
        for _ in 0..handle::MAX_ATTEMPTS {
          let candidate = handle::handle_from_entropy(rng.next_u32());
          if !handle_exists(conn, &candidate)? {
            handle_str = Some(candidate);
            break;
          }
        }
        if handle_str.is_none() {
          for _ in 0..handle::MAX_ATTEMPTS {
            let candidate =
              handle::widened_handle_from_entropy(rng.next_u32());
            if !handle_exists(conn, &candidate)? {
              handle_str = Some(candidate);
              break;
            }
          }
        }
        let Some(handle_str) = handle_str else {
          return Ok(Err(CoreError::HandleSpaceExhausted));
        };

        conn.execute(
          "INSERT INTO users (
             user_id, provider_subject, email, username, display_handle,
             avatar_url, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)",
          params![id_str, provider_subject, email, username, handle_str, at_str],
        )?;
        Ok(Ok(handle_str))
      })
      .await?;

    let display_handle = allocated.map_err(Error::Core)?;

    Ok(User {
      user_id,
      provider_subject: input.provider_subject,
      email: input.email,
      username: input.username,
      display_handle,
      avatar_url: None,
      created_at: now,
      updated_at: now,
    })
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let sql = format!(
      "SELECT {} FROM users WHERE user_id = ?1 AND deleted_at IS NULL",
      RawUser::COLUMNS
    );
    let raw = self
      .conn
      .call(move |conn| Ok(get_user_row(conn, &sql, &id_str)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_provider_subject(
    &self,
    subject: &str,
  ) -> Result<Option<User>> {
    let subject = subject.to_owned();
    let sql = format!(
      "SELECT {} FROM users WHERE provider_subject = ?1 AND deleted_at IS NULL",
      RawUser::COLUMNS
    );
    let raw = self
      .conn
      .call(move |conn| Ok(get_user_row(conn, &sql, &subject)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
    let handle = handle.to_owned();
    let sql = format!(
      "SELECT {} FROM users WHERE display_handle = ?1 AND deleted_at IS NULL",
      RawUser::COLUMNS
    );
    let raw = self
      .conn
      .call(move |conn| Ok(get_user_row(conn, &sql, &handle)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn update_profile(
    &self,
    user_id: Uuid,
    update: ProfileUpdate,
  ) -> Result<User> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());
    let username = update.username;
    let avatar_url = update.avatar_url;

    let raw: std::result::Result<RawUser, CoreError> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET username = ?1, avatar_url = ?2, updated_at = ?3
           WHERE user_id = ?4 AND deleted_at IS NULL",
          params![username, avatar_url, at_str, id_str],
        )?;
        if changed == 0 {
          return Ok(Err(CoreError::UserNotFound(user_id)));
        }
        let sql = format!(
          "SELECT {} FROM users WHERE user_id = ?1",
          RawUser::COLUMNS
        );
        let row = conn.query_row(&sql, params![id_str], RawUser::from_row)?;
        Ok(Ok(row))
      })
      .await?;

    raw.map_err(Error::Core)?.into_user()
  }

  async fn create_session(&self, input: NewSession) -> Result<Session> {
    let session = Session {
      session_id:   Uuid::new_v4(),
      user_id:      input.user_id,
      token_digest: input.token_digest,
      created_at:   Utc::now(),
      expires_at:   input.expires_at,
    };

    let id_str      = encode_uuid(session.session_id);
    let user_str    = encode_uuid(session.user_id);
    let digest      = session.token_digest.clone();
    let created_str = encode_dt(session.created_at);
    let expires_str = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (session_id, user_id, token_digest, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![id_str, user_str, digest, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn session_user(&self, token_digest: &str) -> Result<Option<User>> {
    let digest = token_digest.to_owned();
    let now_str = encode_dt(Utc::now());

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.user_id, u.provider_subject, u.email, u.username,
                      u.display_handle, u.avatar_url, u.created_at, u.updated_at
               FROM sessions s
               JOIN users u ON u.user_id = s.user_id
               WHERE s.token_digest = ?1
                 AND s.expires_at > ?2
                 AND u.deleted_at IS NULL",
              params![digest, now_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Categories ────────────────────────────────────────────────────────────

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT category_id, name, icon, order_index
           FROM categories ORDER BY order_index ASC",
        )?;
        let rows = stmt
          .query_map([], RawCategory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCategory::into_category).collect()
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn create_group(&self, input: NewReviewGroup) -> Result<ReviewGroup> {
    let now = Utc::now();
    let group = ReviewGroup {
      group_id:        Uuid::new_v4(),
      name:            input.name,
      description:     input.description,
      category_id:     input.category_id,
      is_private:      input.is_private,
      image_url:       input.image_url,
      metadata_fields: input.metadata_fields,
      created_at:      now,
      updated_at:      now,
    };

    let group_str    = encode_uuid(group.group_id);
    let name         = group.name.clone();
    let description  = group.description.clone();
    let category_id  = group.category_id;
    let category_str = encode_uuid(group.category_id);
    let is_private   = group.is_private;
    let image_url    = group.image_url.clone();
    let fields_str   = encode_metadata_fields(&group.metadata_fields)?;
    let at_str       = encode_dt(now);
    let owner_str    = encode_uuid(input.owner_id);
    let criteria     = input.criteria;

    let res: std::result::Result<(), CoreError> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let category_ok: bool = tx
          .query_row(
            "SELECT 1 FROM categories WHERE category_id = ?1",
            params![category_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !category_ok {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        }

        tx.execute(
          "INSERT INTO review_groups (
             group_id, name, description, category_id, is_private,
             image_url, metadata_fields, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          params![
            group_str, name, description, category_str, is_private,
            image_url, fields_str, at_str,
          ],
        )?;

        tx.execute(
          "INSERT INTO review_group_members (member_id, group_id, user_id, role, joined_at)
           VALUES (?1, ?2, ?3, 'owner', ?4)",
          params![encode_uuid(Uuid::new_v4()), group_str, owner_str, at_str],
        )?;

        for (index, criterion_name) in criteria.iter().enumerate() {
          tx.execute(
            "INSERT INTO evaluation_criteria (criterion_id, group_id, name, order_index)
             VALUES (?1, ?2, ?3, ?4)",
            params![
              encode_uuid(Uuid::new_v4()),
              group_str,
              criterion_name,
              index as i64,
            ],
          )?;
        }

        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    res.map_err(Error::Core)?;
    Ok(group)
  }

  async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<GroupMembership>> {
    let user_str = encode_uuid(user_id);

    type Row = (RawGroup, RawCategory, String, String);
    let rows: Vec<Row> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT g.group_id, g.name, g.description, g.category_id,
                  g.is_private, g.image_url, g.metadata_fields, g.created_at,
                  g.updated_at,
                  c.category_id, c.name, c.icon, c.order_index,
                  m.role, m.joined_at
           FROM review_group_members m
           JOIN review_groups g ON g.group_id = m.group_id
           JOIN categories c    ON c.category_id = g.category_id
           WHERE m.user_id = ?1
             AND m.deleted_at IS NULL
             AND g.deleted_at IS NULL
           ORDER BY m.joined_at DESC",
        )?;
        let rows = stmt
          .query_map(params![user_str], |row| {
            let group = RawGroup::from_row(row)?;
            let category = RawCategory {
              category_id: row.get(9)?,
              name:        row.get(10)?,
              icon:        row.get(11)?,
              order_index: row.get(12)?,
            };
            Ok((group, category, row.get(13)?, row.get(14)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(group, category, role, joined_at)| {
        Ok(GroupMembership {
          group:     group.into_group()?,
          category:  category.into_category()?,
          role:      crate::encode::decode_role(&role)?,
          joined_at: decode_dt(&joined_at)?,
        })
      })
      .collect()
  }

  async fn group_detail(&self, group_id: Uuid) -> Result<Option<GroupDetail>> {
    let group_str = encode_uuid(group_id);

    type Row = (RawGroup, RawCategory, i64, Vec<RawCriterion>);
    let row: Option<Row> = self
      .conn
      .call(move |conn| {
        let found = conn
          .query_row(
            "SELECT g.group_id, g.name, g.description, g.category_id,
                    g.is_private, g.image_url, g.metadata_fields,
                    g.created_at, g.updated_at,
                    c.category_id, c.name, c.icon, c.order_index
             FROM review_groups g
             JOIN categories c ON c.category_id = g.category_id
             WHERE g.group_id = ?1 AND g.deleted_at IS NULL",
            params![group_str],
            |row| {
              let group = RawGroup::from_row(row)?;
              let category = RawCategory {
                category_id: row.get(9)?,
                name:        row.get(10)?,
                icon:        row.get(11)?,
                order_index: row.get(12)?,
              };
              Ok((group, category))
            },
          )
          .optional()?;

        let Some((group, category)) = found else { return Ok(None) };

        let member_count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM review_group_members
           WHERE group_id = ?1 AND deleted_at IS NULL",
          params![group_str],
          |row| row.get(0),
        )?;

        let criteria = criteria_for_group(conn, &group_str)?;

        Ok(Some((group, category, member_count, criteria)))
      })
      .await?;

    let Some((group, category, member_count, criteria)) = row else {
      return Ok(None);
    };

    Ok(Some(GroupDetail {
      group: group.into_group()?,
      category: category.into_category()?,
      member_count,
      criteria: criteria
        .into_iter()
        .map(RawCriterion::into_criterion)
        .collect::<Result<_>>()?,
    }))
  }

  async fn membership_role(
    &self,
    group_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<MemberRole>> {
    let group_str = encode_uuid(group_id);
    let user_str = encode_uuid(user_id);

    let role: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT role FROM review_group_members
               WHERE group_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
              params![group_str, user_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    role.as_deref().map(crate::encode::decode_role).transpose()
  }

  async fn update_group(
    &self,
    group_id: Uuid,
    update: GroupSettingsUpdate,
  ) -> Result<ReviewGroup> {
    let group_str = encode_uuid(group_id);
    let at_str = encode_dt(Utc::now());

    let raw: std::result::Result<RawGroup, CoreError> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE review_groups
           SET name = ?1, description = ?2, is_private = ?3, image_url = ?4,
               updated_at = ?5
           WHERE group_id = ?6 AND deleted_at IS NULL",
          params![
            update.name,
            update.description,
            update.is_private,
            update.image_url,
            at_str,
            group_str,
          ],
        )?;
        if changed == 0 {
          return Ok(Err(CoreError::GroupNotFound(group_id)));
        }
        let sql = format!(
          "SELECT {} FROM review_groups WHERE group_id = ?1",
          RawGroup::COLUMNS
        );
        let row = conn.query_row(&sql, params![group_str], RawGroup::from_row)?;
        Ok(Ok(row))
      })
      .await?;

    raw.map_err(Error::Core)?.into_group()
  }

  async fn delete_group(&self, group_id: Uuid) -> Result<GroupCascade> {
    let group_str = encode_uuid(group_id);
    let at_str = encode_dt(Utc::now());

    let res: std::result::Result<GroupCascade, CoreError> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM review_groups
             WHERE group_id = ?1 AND deleted_at IS NULL",
            params![group_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(Err(CoreError::GroupNotFound(group_id)));
        }

        // Scores first: they are removed physically, keyed through reviews.
        let scores = tx.execute(
          "DELETE FROM evaluation_scores
           WHERE review_id IN (
             SELECT r.review_id FROM reviews r
             JOIN review_subjects s ON s.subject_id = r.subject_id
             WHERE s.group_id = ?1
           )",
          params![group_str],
        )?;

        let reviews = tx.execute(
          "UPDATE reviews SET deleted_at = ?1
           WHERE deleted_at IS NULL AND subject_id IN (
             SELECT subject_id FROM review_subjects WHERE group_id = ?2
           )",
          params![at_str, group_str],
        )?;

        let subjects = tx.execute(
          "UPDATE review_subjects SET deleted_at = ?1
           WHERE group_id = ?2 AND deleted_at IS NULL",
          params![at_str, group_str],
        )?;

        let criteria = tx.execute(
          "UPDATE evaluation_criteria SET deleted_at = ?1
           WHERE group_id = ?2 AND deleted_at IS NULL",
          params![at_str, group_str],
        )?;

        let memberships = tx.execute(
          "UPDATE review_group_members SET deleted_at = ?1
           WHERE group_id = ?2 AND deleted_at IS NULL",
          params![at_str, group_str],
        )?;

        tx.execute(
          "UPDATE review_groups SET deleted_at = ?1 WHERE group_id = ?2",
          params![at_str, group_str],
        )?;

        tx.commit()?;
        Ok(Ok(GroupCascade { memberships, criteria, subjects, reviews, scores }))
      })
      .await?;

    res.map_err(Error::Core)
  }

  async fn group_criteria(
    &self,
    group_id: Uuid,
  ) -> Result<Vec<EvaluationCriterion>> {
    let group_str = encode_uuid(group_id);
    let raws = self
      .conn
      .call(move |conn| Ok(criteria_for_group(conn, &group_str)?))
      .await?;
    raws.into_iter().map(RawCriterion::into_criterion).collect()
  }

  // ── Membership & invitations ──────────────────────────────────────────────

  async fn add_member(
    &self,
    group_id: Uuid,
    user_id: Uuid,
    role: MemberRole,
  ) -> Result<()> {
    let group_str = encode_uuid(group_id);
    let user_str = encode_uuid(user_id);
    let role_str = encode_role(role);
    let at_str = encode_dt(Utc::now());

    let res: std::result::Result<(), CoreError> = self
      .conn
      .call(move |conn| {
        let already: bool = conn
          .query_row(
            "SELECT 1 FROM review_group_members
             WHERE group_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            params![group_str, user_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if already {
          return Ok(Err(CoreError::AlreadyMember));
        }

        conn.execute(
          "INSERT INTO review_group_members (member_id, group_id, user_id, role, joined_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![encode_uuid(Uuid::new_v4()), group_str, user_str, role_str, at_str],
        )?;
        Ok(Ok(()))
      })
      .await?;

    res.map_err(Error::Core)
  }

  async fn list_members(&self, group_id: Uuid) -> Result<Vec<MemberProfile>> {
    let group_str = encode_uuid(group_id);

    let raws: Vec<RawMemberProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT u.user_id, u.username, u.display_handle, u.avatar_url,
                  m.role, m.joined_at
           FROM review_group_members m
           JOIN users u ON u.user_id = m.user_id
           WHERE m.group_id = ?1 AND m.deleted_at IS NULL
           ORDER BY m.joined_at ASC",
        )?;
        let rows = stmt
          .query_map(params![group_str], RawMemberProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMemberProfile::into_profile).collect()
  }

  async fn create_invitation(
    &self,
    input: NewInvitation,
  ) -> Result<Invitation> {
    let invitation = Invitation {
      invitation_id:  Uuid::new_v4(),
      group_id:       input.group_id,
      inviter_id:     input.inviter_id,
      invited_handle: input.invited_handle,
      status:         InvitationStatus::Pending,
      created_at:     Utc::now(),
    };

    let inv_str     = encode_uuid(invitation.invitation_id);
    let group_str   = encode_uuid(invitation.group_id);
    let inviter_str = encode_uuid(invitation.inviter_id);
    let handle_str  = invitation.invited_handle.clone();
    let status_str  = encode_invitation_status(invitation.status);
    let at_str      = encode_dt(invitation.created_at);

    let res: std::result::Result<(), CoreError> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let invited_user: Option<String> = tx
          .query_row(
            "SELECT user_id FROM users
             WHERE display_handle = ?1 AND deleted_at IS NULL",
            params![handle_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(invited_user) = invited_user else {
          return Ok(Err(CoreError::HandleNotFound(handle_str)));
        };

        let already_member: bool = tx
          .query_row(
            "SELECT 1 FROM review_group_members
             WHERE group_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            params![group_str, invited_user],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if already_member {
          return Ok(Err(CoreError::AlreadyMember));
        }

        let already_invited: bool = tx
          .query_row(
            "SELECT 1 FROM invitations
             WHERE group_id = ?1 AND invited_handle = ?2
               AND status = 'pending' AND deleted_at IS NULL",
            params![group_str, handle_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if already_invited {
          return Ok(Err(CoreError::AlreadyInvited));
        }

        tx.execute(
          "INSERT INTO invitations (
             invitation_id, group_id, inviter_id, invited_handle, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![inv_str, group_str, inviter_str, handle_str, status_str, at_str],
        )?;

        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    res.map_err(Error::Core)?;
    Ok(invitation)
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn create_subject(&self, input: NewSubject) -> Result<ReviewSubject> {
    let now = Utc::now();
    let subject = ReviewSubject {
      subject_id: Uuid::new_v4(),
      group_id:   input.group_id,
      name:       input.name,
      images:     input.images,
      metadata:   input.metadata,
      created_by: input.created_by,
      created_at: now,
      updated_at: now,
    };

    let id_str       = encode_uuid(subject.subject_id);
    let group_str    = encode_uuid(subject.group_id);
    let name         = subject.name.clone();
    let images_str   = encode_string_list(&subject.images)?;
    let metadata_str = encode_metadata(&subject.metadata)?;
    let creator_str  = encode_uuid(subject.created_by);
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO review_subjects (
             subject_id, group_id, name, images, metadata, created_by,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          params![
            id_str, group_str, name, images_str, metadata_str, creator_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(subject)
  }

  async fn list_subjects(&self, group_id: Uuid) -> Result<Vec<SubjectSummary>> {
    let group_str = encode_uuid(group_id);

    type Latest = (Option<String>, f64, String, String);
    type Row = (RawSubject, i64, f64, Option<Latest>);
    let rows: Vec<Row> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM review_subjects
           WHERE group_id = ?1 AND deleted_at IS NULL
           ORDER BY created_at DESC",
          RawSubject::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let subjects = stmt
          .query_map(params![group_str], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats_stmt = conn.prepare(
          "SELECT COUNT(*), COALESCE(AVG(total_score), 0.0)
           FROM reviews WHERE subject_id = ?1 AND deleted_at IS NULL",
        )?;
        let mut latest_stmt = conn.prepare(
          "SELECT r.comment, r.total_score, r.created_at, u.username
           FROM reviews r
           JOIN users u ON u.user_id = r.user_id
           WHERE r.subject_id = ?1 AND r.deleted_at IS NULL
           ORDER BY r.created_at DESC
           LIMIT 1",
        )?;

        let mut rows = Vec::with_capacity(subjects.len());
        for subject in subjects {
          let (count, average): (i64, f64) = stats_stmt
            .query_row(params![subject.subject_id], |row| {
              Ok((row.get(0)?, row.get(1)?))
            })?;
          let latest: Option<Latest> = latest_stmt
            .query_row(params![subject.subject_id], |row| {
              Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()?;
          rows.push((subject, count, average, latest));
        }
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(subject, review_count, average_score, latest)| {
        let latest_review = latest
          .map(|(comment, total_score, created_at, username)| {
            Ok::<_, Error>(LatestReview {
              comment,
              total_score,
              created_at: decode_dt(&created_at)?,
              username,
            })
          })
          .transpose()?;
        Ok(SubjectSummary {
          subject: subject.into_subject()?,
          review_count,
          average_score,
          latest_review,
        })
      })
      .collect()
  }

  async fn get_subject(
    &self,
    group_id: Uuid,
    subject_id: Uuid,
  ) -> Result<Option<ReviewSubject>> {
    let group_str = encode_uuid(group_id);
    let subject_str = encode_uuid(subject_id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM review_subjects
           WHERE subject_id = ?1 AND group_id = ?2 AND deleted_at IS NULL",
          RawSubject::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, params![subject_str, group_str], RawSubject::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn subject_detail(
    &self,
    group_id: Uuid,
    subject_id: Uuid,
  ) -> Result<Option<SubjectDetail>> {
    let group_str = encode_uuid(group_id);
    let subject_str = encode_uuid(subject_id);

    type Row = (RawSubject, i64, f64, Vec<(String, String, f64)>);
    let row: Option<Row> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM review_subjects
           WHERE subject_id = ?1 AND group_id = ?2 AND deleted_at IS NULL",
          RawSubject::COLUMNS
        );
        let subject = conn
          .query_row(&sql, params![subject_str, group_str], RawSubject::from_row)
          .optional()?;
        let Some(subject) = subject else { return Ok(None) };

        let (review_count, average_score): (i64, f64) = conn.query_row(
          "SELECT COUNT(*), COALESCE(AVG(total_score), 0.0)
           FROM reviews WHERE subject_id = ?1 AND deleted_at IS NULL",
          params![subject_str],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        // Per-criterion means over all active reviews, reduced at read time.
        let mut stmt = conn.prepare(
          "SELECT s.criterion_id, c.name, AVG(s.score)
           FROM evaluation_scores s
           JOIN reviews r ON r.review_id = s.review_id
           JOIN evaluation_criteria c ON c.criterion_id = s.criterion_id
           WHERE r.subject_id = ?1 AND r.deleted_at IS NULL
           GROUP BY s.criterion_id, c.name
           ORDER BY c.order_index ASC",
        )?;
        let breakdown = stmt
          .query_map(params![subject_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((subject, review_count, average_score, breakdown)))
      })
      .await?;

    let Some((subject, review_count, average_score, breakdown)) = row else {
      return Ok(None);
    };

    Ok(Some(SubjectDetail {
      subject: subject.into_subject()?,
      review_count,
      average_score,
      score_breakdown: breakdown
        .into_iter()
        .map(|(criterion_id, name, average_score)| {
          Ok::<_, Error>(CriterionAverage {
            criterion_id: decode_uuid(&criterion_id)?,
            name,
            average_score,
          })
        })
        .collect::<Result<_>>()?,
    }))
  }

  async fn update_subject(
    &self,
    subject_id: Uuid,
    update: SubjectUpdate,
  ) -> Result<ReviewSubject> {
    let subject_str = encode_uuid(subject_id);
    let at_str = encode_dt(Utc::now());
    let images_str = encode_string_list(&update.images)?;
    let metadata_str = encode_metadata(&update.metadata)?;
    let name = update.name;

    let raw: std::result::Result<RawSubject, CoreError> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE review_subjects
           SET name = ?1, images = ?2, metadata = ?3, updated_at = ?4
           WHERE subject_id = ?5 AND deleted_at IS NULL",
          params![name, images_str, metadata_str, at_str, subject_str],
        )?;
        if changed == 0 {
          return Ok(Err(CoreError::SubjectNotFound(subject_id)));
        }
        let sql = format!(
          "SELECT {} FROM review_subjects WHERE subject_id = ?1",
          RawSubject::COLUMNS
        );
        let row =
          conn.query_row(&sql, params![subject_str], RawSubject::from_row)?;
        Ok(Ok(row))
      })
      .await?;

    raw.map_err(Error::Core)?.into_subject()
  }

  async fn delete_subject(&self, subject_id: Uuid) -> Result<()> {
    let subject_str = encode_uuid(subject_id);
    let at_str = encode_dt(Utc::now());

    let res: std::result::Result<(), CoreError> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM review_subjects
             WHERE subject_id = ?1 AND deleted_at IS NULL",
            params![subject_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(Err(CoreError::SubjectNotFound(subject_id)));
        }

        let reviewed: bool = tx
          .query_row(
            "SELECT 1 FROM reviews
             WHERE subject_id = ?1 AND deleted_at IS NULL LIMIT 1",
            params![subject_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if reviewed {
          return Ok(Err(CoreError::SubjectHasReviews));
        }

        tx.execute(
          "UPDATE review_subjects SET deleted_at = ?1 WHERE subject_id = ?2",
          params![at_str, subject_str],
        )?;

        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    res.map_err(Error::Core)
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn create_review(&self, input: NewReview) -> Result<Review> {
    let now = Utc::now();
    let review_id = Uuid::new_v4();

    let review_str  = encode_uuid(review_id);
    let subject_id  = input.subject_id;
    let subject_str = encode_uuid(input.subject_id);
    let user_str    = encode_uuid(input.user_id);
    let comment     = input.comment.clone();
    let images_str  = encode_string_list(&input.images)?;
    let at_str      = encode_dt(now);
    let scores      = input.scores.clone();

    let res: std::result::Result<f64, CoreError> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let group_str: Option<String> = tx
          .query_row(
            "SELECT group_id FROM review_subjects
             WHERE subject_id = ?1 AND deleted_at IS NULL",
            params![subject_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(group_str) = group_str else {
          return Ok(Err(CoreError::SubjectNotFound(subject_id)));
        };

        let already: bool = tx
          .query_row(
            "SELECT 1 FROM reviews
             WHERE subject_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            params![subject_str, user_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if already {
          return Ok(Err(CoreError::AlreadyReviewed));
        }

        let criteria = criteria_for_group(&tx, &group_str)?
          .into_iter()
          .map(RawCriterion::into_criterion)
          .collect::<Result<Vec<_>>>()
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        let total = match validate_scores(&criteria, &scores) {
          Ok(total) => total,
          Err(e) => return Ok(Err(e)),
        };

        tx.execute(
          "INSERT INTO reviews (
             review_id, subject_id, user_id, comment, images, total_score,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          params![
            review_str, subject_str, user_str, comment, images_str, total,
            at_str,
          ],
        )?;

        insert_score_rows(&tx, &review_str, &scores)?;

        tx.commit()?;
        Ok(Ok(total))
      })
      .await?;

    let total_score = res.map_err(Error::Core)?;

    Ok(Review {
      review_id,
      subject_id: input.subject_id,
      user_id: input.user_id,
      comment: input.comment,
      images: input.images,
      total_score,
      created_at: now,
      updated_at: now,
    })
  }

  async fn list_reviews(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<ReviewWithAuthor>> {
    let subject_str = encode_uuid(subject_id);

    type AuthorCols = (String, String, String, Option<String>);
    type Row = (RawReview, AuthorCols, Vec<(String, String, u8)>);
    let rows: Vec<Row> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.review_id, r.subject_id, r.user_id, r.comment, r.images,
                  r.total_score, r.created_at, r.updated_at,
                  u.user_id, u.username, u.display_handle, u.avatar_url
           FROM reviews r
           JOIN users u ON u.user_id = r.user_id
           WHERE r.subject_id = ?1 AND r.deleted_at IS NULL
           ORDER BY r.created_at DESC",
        )?;
        let reviews = stmt
          .query_map(params![subject_str], |row| {
            let review = RawReview::from_row(row)?;
            let author: AuthorCols =
              (row.get(8)?, row.get(9)?, row.get(10)?, row.get(11)?);
            Ok((review, author))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(reviews.len());
        for (review, author) in reviews {
          let scores = review_scores(conn, &review.review_id)?;
          rows.push((review, author, scores));
        }
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(review, (user_id, username, display_handle, avatar_url), scores)| {
        Ok(ReviewWithAuthor {
          review: review.into_review()?,
          author: crate::encode::RawReviewAuthor {
            user_id,
            username,
            display_handle,
            avatar_url,
          }
          .into_author()?,
          scores: named_scores(scores)?,
        })
      })
      .collect()
  }

  async fn get_user_review(
    &self,
    subject_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<ScoredReview>> {
    let subject_str = encode_uuid(subject_id);
    let user_str = encode_uuid(user_id);

    type Row = (RawReview, Vec<(String, String, u8)>);
    let row: Option<Row> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM reviews
           WHERE subject_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
          RawReview::COLUMNS
        );
        let review = conn
          .query_row(&sql, params![subject_str, user_str], RawReview::from_row)
          .optional()?;
        let Some(review) = review else { return Ok(None) };

        let scores = review_scores(conn, &review.review_id)?;
        Ok(Some((review, scores)))
      })
      .await?;

    let Some((review, scores)) = row else { return Ok(None) };
    Ok(Some(ScoredReview {
      review: review.into_review()?,
      scores: named_scores(scores)?,
    }))
  }

  async fn update_review(
    &self,
    subject_id: Uuid,
    user_id: Uuid,
    update: ReviewUpdate,
  ) -> Result<Review> {
    let subject_str = encode_uuid(subject_id);
    let user_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());
    let comment = update.comment;
    let images_str = encode_string_list(&update.images)?;
    let scores = update.scores;

    let res: std::result::Result<RawReview, CoreError> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<(String, String)> = tx
          .query_row(
            "SELECT r.review_id, s.group_id
             FROM reviews r
             JOIN review_subjects s ON s.subject_id = r.subject_id
             WHERE r.subject_id = ?1 AND r.user_id = ?2
               AND r.deleted_at IS NULL",
            params![subject_str, user_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;
        let Some((review_str, group_str)) = existing else {
          return Ok(Err(CoreError::ReviewNotFound));
        };

        let criteria = criteria_for_group(&tx, &group_str)?
          .into_iter()
          .map(RawCriterion::into_criterion)
          .collect::<Result<Vec<_>>>()
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        let total = match validate_scores(&criteria, &scores) {
          Ok(total) => total,
          Err(e) => return Ok(Err(e)),
        };

        tx.execute(
          "UPDATE reviews
           SET comment = ?1, images = ?2, total_score = ?3, updated_at = ?4
           WHERE review_id = ?5",
          params![comment, images_str, total, at_str, review_str],
        )?;

        // Replace, never upsert.
        tx.execute(
          "DELETE FROM evaluation_scores WHERE review_id = ?1",
          params![review_str],
        )?;
        insert_score_rows(&tx, &review_str, &scores)?;

        let sql = format!(
          "SELECT {} FROM reviews WHERE review_id = ?1",
          RawReview::COLUMNS
        );
        let row = tx.query_row(&sql, params![review_str], RawReview::from_row)?;

        tx.commit()?;
        Ok(Ok(row))
      })
      .await?;

    res.map_err(Error::Core)?.into_review()
  }

  async fn delete_review(&self, subject_id: Uuid, user_id: Uuid) -> Result<()> {
    let subject_str = encode_uuid(subject_id);
    let user_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());

    let res: std::result::Result<(), CoreError> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let review_str: Option<String> = tx
          .query_row(
            "SELECT review_id FROM reviews
             WHERE subject_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            params![subject_str, user_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(review_str) = review_str else {
          return Ok(Err(CoreError::ReviewNotFound));
        };

        tx.execute(
          "DELETE FROM evaluation_scores WHERE review_id = ?1",
          params![review_str],
        )?;
        tx.execute(
          "UPDATE reviews SET deleted_at = ?1 WHERE review_id = ?2",
          params![at_str, review_str],
        )?;

        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    res.map_err(Error::Core)
  }
}
