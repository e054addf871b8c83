//! The `ReviewStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `revibako-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  group::{
    Category, EvaluationCriterion, GroupCascade, GroupDetail, GroupMembership,
    GroupSettingsUpdate, MemberProfile, MemberRole, NewReviewGroup,
    ReviewGroup,
  },
  invitation::{Invitation, NewInvitation},
  review::{NewReview, Review, ReviewUpdate, ReviewWithAuthor, ScoredReview},
  session::{NewSession, Session},
  subject::{NewSubject, ReviewSubject, SubjectDetail, SubjectSummary,
    SubjectUpdate},
  user::{NewUser, ProfileUpdate, User},
};

/// Abstraction over a Review Box storage backend.
///
/// All rows are soft-deleted (readers filter on the deletion timestamp)
/// except evaluation scores, which are removed physically alongside their
/// review. Multi-row mutations — group creation, group deletion, review
/// writes — are atomic within a single call.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ReviewStore: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Users & sessions ──────────────────────────────────────────────────

  /// Create a user, assigning a fresh unique display handle with a bounded
  /// retry loop. Fails with `IdentityTaken` if the provider subject is
  /// already registered.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if missing or deleted.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up the user bound to an OAuth provider subject.
  fn find_user_by_provider_subject<'a>(
    &'a self,
    subject: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Look up a user by display handle.
  fn find_user_by_handle<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Update the caller's own profile fields.
  fn update_profile(
    &self,
    user_id: Uuid,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Persist a new session.
  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Resolve a session-token digest to its user, enforcing expiry.
  fn session_user<'a>(
    &'a self,
    token_digest: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Categories ────────────────────────────────────────────────────────

  /// All categories, ordered by display order.
  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  // ── Groups ────────────────────────────────────────────────────────────

  /// Create a group, its owner membership, and its criteria atomically.
  /// Fails with `CategoryNotFound` for an unknown category.
  fn create_group(
    &self,
    input: NewReviewGroup,
  ) -> impl Future<Output = Result<ReviewGroup, Self::Error>> + Send + '_;

  /// Groups the user belongs to, most recent join first.
  fn groups_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<GroupMembership>, Self::Error>> + Send + '_;

  /// Group detail with category, live member count, and ordered criteria.
  fn group_detail(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Option<GroupDetail>, Self::Error>> + Send + '_;

  /// The caller's role in a group, or `None` if not an active member.
  fn membership_role(
    &self,
    group_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<MemberRole>, Self::Error>> + Send + '_;

  /// Update a group's settings.
  fn update_group(
    &self,
    group_id: Uuid,
    update: GroupSettingsUpdate,
  ) -> impl Future<Output = Result<ReviewGroup, Self::Error>> + Send + '_;

  /// Soft-delete a group and cascade: memberships, criteria, subjects, and
  /// reviews are soft-deleted; evaluation scores are removed physically.
  /// Runs as one transaction and reports the touched row counts.
  fn delete_group(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<GroupCascade, Self::Error>> + Send + '_;

  /// A group's evaluation criteria in display order.
  fn group_criteria(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Vec<EvaluationCriterion>, Self::Error>> + Send + '_;

  // ── Membership & invitations ──────────────────────────────────────────

  /// Add a user to a group. Fails with `AlreadyMember` if an active
  /// membership already exists.
  fn add_member(
    &self,
    group_id: Uuid,
    user_id: Uuid,
    role: MemberRole,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Active members of a group with their profiles, oldest join first.
  fn list_members(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Vec<MemberProfile>, Self::Error>> + Send + '_;

  /// Record a pending invitation. Fails with `HandleNotFound` for an
  /// unknown handle, `AlreadyMember` if the target is an active member, and
  /// `AlreadyInvited` if a pending invitation already exists.
  fn create_invitation(
    &self,
    input: NewInvitation,
  ) -> impl Future<Output = Result<Invitation, Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Add a subject to a group.
  fn create_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<ReviewSubject, Self::Error>> + Send + '_;

  /// Subjects of a group, newest first, with review aggregates.
  fn list_subjects(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SubjectSummary>, Self::Error>> + Send + '_;

  /// A bare subject row scoped to its group.
  fn get_subject(
    &self,
    group_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<ReviewSubject>, Self::Error>> + Send + '_;

  /// Subject detail with review count, mean total score, and per-criterion
  /// mean breakdown, reduced over all active reviews at read time.
  fn subject_detail(
    &self,
    group_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<SubjectDetail>, Self::Error>> + Send + '_;

  /// Update a subject's name, images, and metadata.
  fn update_subject(
    &self,
    subject_id: Uuid,
    update: SubjectUpdate,
  ) -> impl Future<Output = Result<ReviewSubject, Self::Error>> + Send + '_;

  /// Soft-delete a subject. Fails with `SubjectHasReviews` while at least
  /// one active review exists.
  fn delete_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// Create a review and its score rows in one transaction. Scores are
  /// validated against the group's criteria and the total derived from
  /// them. Fails with `AlreadyReviewed` if the user has an active review of
  /// the subject.
  fn create_review(
    &self,
    input: NewReview,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  /// Active reviews of a subject, newest first, with author profiles and
  /// named scores.
  fn list_reviews(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ReviewWithAuthor>, Self::Error>> + Send + '_;

  /// The caller's own active review of a subject, with scores.
  fn get_user_review(
    &self,
    subject_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<ScoredReview>, Self::Error>> + Send + '_;

  /// Re-validate scores, recompute the total, and replace all score rows
  /// (delete-then-insert) in one transaction.
  fn update_review(
    &self,
    subject_id: Uuid,
    user_id: Uuid,
    update: ReviewUpdate,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  /// Hard-delete the score rows, then soft-delete the review.
  fn delete_review(
    &self,
    subject_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
