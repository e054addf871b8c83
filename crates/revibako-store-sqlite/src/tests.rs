//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeMap;

use chrono::Utc;
use revibako_core::{
  Error as CoreError,
  group::{GroupSettingsUpdate, MemberRole, NewReviewGroup},
  invitation::NewInvitation,
  review::{NewReview, ReviewUpdate},
  session::NewSession,
  store::ReviewStore,
  subject::{MetadataValues, NewSubject, SubjectUpdate},
  user::{NewUser, ProfileUpdate, User},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_user(tag: &str) -> NewUser {
  NewUser {
    provider_subject: format!("oauth|{tag}"),
    email:            format!("{tag}@example.com"),
    username:         tag.to_owned(),
  }
}

async fn register(s: &SqliteStore, tag: &str) -> User {
  s.create_user(new_user(tag)).await.unwrap()
}

async fn make_group(
  s: &SqliteStore,
  owner: &User,
  criteria: &[&str],
) -> revibako_core::group::ReviewGroup {
  let category = s.list_categories().await.unwrap()[0].clone();
  s.create_group(NewReviewGroup {
    name:            "Ramen club".into(),
    description:     Some("Lunch spots near the office".into()),
    category_id:     category.category_id,
    is_private:      true,
    image_url:       None,
    metadata_fields: Vec::new(),
    criteria:        criteria.iter().map(|c| (*c).to_owned()).collect(),
    owner_id:        owner.user_id,
  })
  .await
  .unwrap()
}

async fn make_subject(
  s: &SqliteStore,
  group_id: Uuid,
  creator: &User,
  name: &str,
) -> revibako_core::subject::ReviewSubject {
  s.create_subject(NewSubject {
    group_id,
    name: name.into(),
    images: Vec::new(),
    metadata: MetadataValues::new(),
    created_by: creator.user_id,
  })
  .await
  .unwrap()
}

fn scores_for(
  criteria: &[revibako_core::group::EvaluationCriterion],
  values: &[u8],
) -> BTreeMap<Uuid, u8> {
  criteria
    .iter()
    .zip(values)
    .map(|(c, &v)| (c.criterion_id, v))
    .collect()
}

// ─── Registration ────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_assigns_six_digit_handle() {
  let s = store().await;
  let user = register(&s, "alice").await;

  assert_eq!(user.display_handle.len(), 6);
  assert!(user.display_handle.bytes().all(|b| b.is_ascii_digit()));
  assert!(!user.display_handle.starts_with('0'));
}

#[tokio::test]
async fn handles_are_unique_across_users() {
  let s = store().await;
  let mut seen = std::collections::HashSet::new();
  for i in 0..25 {
    let user = register(&s, &format!("user{i}")).await;
    assert!(seen.insert(user.display_handle), "duplicate handle allocated");
  }
}

#[tokio::test]
async fn duplicate_provider_subject_is_conflict() {
  let s = store().await;
  register(&s, "alice").await;

  let err = s.create_user(new_user("alice")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::IdentityTaken)));
}

#[tokio::test]
async fn find_user_by_handle_and_subject() {
  let s = store().await;
  let user = register(&s, "alice").await;

  let by_id = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(by_id.display_handle, user.display_handle);
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());

  let by_handle = s
    .find_user_by_handle(&user.display_handle)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_handle.user_id, user.user_id);

  let by_subject = s
    .find_user_by_provider_subject("oauth|alice")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_subject.user_id, user.user_id);

  assert!(s.find_user_by_handle("000000").await.unwrap().is_none());
}

#[tokio::test]
async fn update_profile_changes_username_and_avatar() {
  let s = store().await;
  let user = register(&s, "alice").await;

  let updated = s
    .update_profile(user.user_id, ProfileUpdate {
      username:   "アリス".into(),
      avatar_url: Some("https://img.example.com/a.png".into()),
    })
    .await
    .unwrap();

  assert_eq!(updated.username, "アリス");
  assert_eq!(
    updated.avatar_url.as_deref(),
    Some("https://img.example.com/a.png")
  );
  // Handle never changes on profile edits.
  assert_eq!(updated.display_handle, user.display_handle);
}

#[tokio::test]
async fn update_profile_unknown_user_errors() {
  let s = store().await;
  let err = s
    .update_profile(Uuid::new_v4(), ProfileUpdate {
      username:   "ghost".into(),
      avatar_url: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::UserNotFound(_))));
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_roundtrip() {
  let s = store().await;
  let user = register(&s, "alice").await;

  s.create_session(NewSession {
    user_id:      user.user_id,
    token_digest: "digest-1".into(),
    expires_at:   Utc::now() + chrono::Duration::hours(1),
  })
  .await
  .unwrap();

  let resolved = s.session_user("digest-1").await.unwrap().unwrap();
  assert_eq!(resolved.user_id, user.user_id);

  assert!(s.session_user("digest-2").await.unwrap().is_none());
}

#[tokio::test]
async fn expired_session_is_rejected() {
  let s = store().await;
  let user = register(&s, "alice").await;

  s.create_session(NewSession {
    user_id:      user.user_id,
    token_digest: "stale".into(),
    expires_at:   Utc::now() - chrono::Duration::seconds(1),
  })
  .await
  .unwrap();

  assert!(s.session_user("stale").await.unwrap().is_none());
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn categories_are_seeded_in_order() {
  let s = store().await;
  let categories = s.list_categories().await.unwrap();

  assert!(!categories.is_empty());
  for pair in categories.windows(2) {
    assert!(pair[0].order_index < pair[1].order_index);
  }
}

#[tokio::test]
async fn rerunning_schema_init_does_not_duplicate_seed() {
  let s = store().await;
  let before = s.list_categories().await.unwrap().len();
  s.init_schema().await.unwrap();
  let after = s.list_categories().await.unwrap().len();
  assert_eq!(before, after);
}

// ─── Groups ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_group_creates_owner_and_criteria() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste", "Price"]).await;

  let role = s
    .membership_role(group.group_id, owner.user_id)
    .await
    .unwrap();
  assert_eq!(role, Some(MemberRole::Owner));

  let criteria = s.group_criteria(group.group_id).await.unwrap();
  assert_eq!(criteria.len(), 2);
  assert_eq!(criteria[0].name, "Taste");
  assert_eq!(criteria[0].order_index, 0);
  assert_eq!(criteria[1].name, "Price");
  assert_eq!(criteria[1].order_index, 1);
}

#[tokio::test]
async fn create_group_with_unknown_category_errors() {
  let s = store().await;
  let owner = register(&s, "alice").await;

  let err = s
    .create_group(NewReviewGroup {
      name:            "Ghost club".into(),
      description:     None,
      category_id:     Uuid::new_v4(),
      is_private:      true,
      image_url:       None,
      metadata_fields: Vec::new(),
      criteria:        vec!["Taste".into()],
      owner_id:        owner.user_id,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::CategoryNotFound(_))));

  // The transaction rolled back: no stray membership was left behind.
  assert!(s.groups_for_user(owner.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn groups_for_user_newest_join_first() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let first = make_group(&s, &owner, &["Taste"]).await;
  let second = make_group(&s, &owner, &["Story"]).await;

  let memberships = s.groups_for_user(owner.user_id).await.unwrap();
  assert_eq!(memberships.len(), 2);
  let ids: Vec<_> = memberships.iter().map(|m| m.group.group_id).collect();
  assert!(ids.contains(&first.group_id));
  assert!(ids.contains(&second.group_id));
  assert!(memberships.iter().all(|m| m.role == MemberRole::Owner));
}

#[tokio::test]
async fn group_detail_counts_members() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;

  let detail = s.group_detail(group.group_id).await.unwrap().unwrap();
  assert_eq!(detail.member_count, 1);
  assert_eq!(detail.category.category_id, group.category_id);
  assert_eq!(detail.criteria.len(), 1);

  assert!(s.group_detail(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_group_settings() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;

  let updated = s
    .update_group(group.group_id, GroupSettingsUpdate {
      name:        "Noodle society".into(),
      description: None,
      is_private:  false,
      image_url:   Some("https://img.example.com/g.png".into()),
    })
    .await
    .unwrap();

  assert_eq!(updated.name, "Noodle society");
  assert_eq!(updated.description, None);
  assert!(!updated.is_private);
}

#[tokio::test]
async fn delete_group_cascades() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let reviewer = register(&s, "bob").await;
  let group = make_group(&s, &owner, &["Taste", "Price"]).await;
  s.add_member(group.group_id, reviewer.user_id, MemberRole::Member)
    .await
    .unwrap();

  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let ramen = make_subject(&s, group.group_id, &owner, "Ichiran").await;
  let soba = make_subject(&s, group.group_id, &owner, "Nagasaka").await;

  for (user, values) in [(&owner, [4u8, 2]), (&reviewer, [5, 5])] {
    s.create_review(NewReview {
      subject_id: ramen.subject_id,
      user_id:    user.user_id,
      comment:    None,
      images:     Vec::new(),
      scores:     scores_for(&criteria, &values),
    })
    .await
    .unwrap();
  }

  let cascade = s.delete_group(group.group_id).await.unwrap();
  assert_eq!(cascade.memberships, 2);
  assert_eq!(cascade.criteria, 2);
  assert_eq!(cascade.subjects, 2);
  assert_eq!(cascade.reviews, 2);
  // Two reviews × two criteria, removed physically.
  assert_eq!(cascade.scores, 4);

  assert!(s.group_detail(group.group_id).await.unwrap().is_none());
  assert!(s.groups_for_user(owner.user_id).await.unwrap().is_empty());
  assert!(
    s.get_subject(group.group_id, soba.subject_id)
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    s.membership_role(group.group_id, owner.user_id)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn delete_group_twice_errors() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;

  s.delete_group(group.group_id).await.unwrap();
  let err = s.delete_group(group.group_id).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::GroupNotFound(_))));
}

// ─── Membership & invitations ────────────────────────────────────────────────

#[tokio::test]
async fn list_members_oldest_join_first() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let friend = register(&s, "bob").await;
  let group = make_group(&s, &owner, &["Taste"]).await;
  s.add_member(group.group_id, friend.user_id, MemberRole::Member)
    .await
    .unwrap();

  let members = s.list_members(group.group_id).await.unwrap();
  assert_eq!(members.len(), 2);
  assert_eq!(members[0].user_id, owner.user_id);
  assert_eq!(members[0].role, MemberRole::Owner);
  assert_eq!(members[1].user_id, friend.user_id);
  assert_eq!(members[1].role, MemberRole::Member);
}

#[tokio::test]
async fn invitation_happy_path() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let friend = register(&s, "bob").await;
  let group = make_group(&s, &owner, &["Taste"]).await;

  let invitation = s
    .create_invitation(NewInvitation {
      group_id:       group.group_id,
      inviter_id:     owner.user_id,
      invited_handle: friend.display_handle.clone(),
    })
    .await
    .unwrap();

  assert_eq!(invitation.invited_handle, friend.display_handle);
  assert_eq!(
    invitation.status,
    revibako_core::invitation::InvitationStatus::Pending
  );
}

#[tokio::test]
async fn invite_unknown_handle_errors() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;

  let err = s
    .create_invitation(NewInvitation {
      group_id:       group.group_id,
      inviter_id:     owner.user_id,
      invited_handle: "999999".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::HandleNotFound(_))));
}

#[tokio::test]
async fn invite_existing_member_is_conflict() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;

  let err = s
    .create_invitation(NewInvitation {
      group_id:       group.group_id,
      inviter_id:     owner.user_id,
      invited_handle: owner.display_handle.clone(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::AlreadyMember)));
}

#[tokio::test]
async fn duplicate_pending_invitation_is_conflict() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let friend = register(&s, "bob").await;
  let group = make_group(&s, &owner, &["Taste"]).await;

  s.create_invitation(NewInvitation {
    group_id:       group.group_id,
    inviter_id:     owner.user_id,
    invited_handle: friend.display_handle.clone(),
  })
  .await
  .unwrap();

  let err = s
    .create_invitation(NewInvitation {
      group_id:       group.group_id,
      inviter_id:     owner.user_id,
      invited_handle: friend.display_handle.clone(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::AlreadyInvited)));
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn subject_list_aggregates_reviews() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let friend = register(&s, "bob").await;
  let group = make_group(&s, &owner, &["Taste", "Price"]).await;
  s.add_member(group.group_id, friend.user_id, MemberRole::Member)
    .await
    .unwrap();
  let criteria = s.group_criteria(group.group_id).await.unwrap();

  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;
  make_subject(&s, group.group_id, &owner, "Unreviewed spot").await;

  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    owner.user_id,
    comment:    Some("rich broth".into()),
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[4, 2]),
  })
  .await
  .unwrap();
  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    friend.user_id,
    comment:    Some("pricey".into()),
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[5, 5]),
  })
  .await
  .unwrap();

  let summaries = s.list_subjects(group.group_id).await.unwrap();
  assert_eq!(summaries.len(), 2);

  let reviewed = summaries
    .iter()
    .find(|x| x.subject.subject_id == subject.subject_id)
    .unwrap();
  assert_eq!(reviewed.review_count, 2);
  // Mean of totals 3.0 and 5.0.
  assert!((reviewed.average_score - 4.0).abs() < 1e-9);
  assert!(reviewed.latest_review.is_some());

  let unreviewed = summaries
    .iter()
    .find(|x| x.subject.subject_id != subject.subject_id)
    .unwrap();
  assert_eq!(unreviewed.review_count, 0);
  assert_eq!(unreviewed.average_score, 0.0);
  assert!(unreviewed.latest_review.is_none());
}

#[tokio::test]
async fn subject_detail_breaks_scores_down_per_criterion() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let friend = register(&s, "bob").await;
  let group = make_group(&s, &owner, &["Taste", "Price"]).await;
  s.add_member(group.group_id, friend.user_id, MemberRole::Member)
    .await
    .unwrap();
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    owner.user_id,
    comment:    None,
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[4, 2]),
  })
  .await
  .unwrap();
  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    friend.user_id,
    comment:    None,
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[2, 4]),
  })
  .await
  .unwrap();

  let detail = s
    .subject_detail(group.group_id, subject.subject_id)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(detail.review_count, 2);
  assert!((detail.average_score - 3.0).abs() < 1e-9);
  assert_eq!(detail.score_breakdown.len(), 2);

  let taste = &detail.score_breakdown[0];
  assert_eq!(taste.name, "Taste");
  assert!((taste.average_score - 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn update_subject_replaces_fields() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  let mut metadata = MetadataValues::new();
  metadata.insert("area".into(), serde_json::json!("Shibuya"));

  let updated = s
    .update_subject(subject.subject_id, SubjectUpdate {
      name: "Ichiran Shibuya".into(),
      images: vec!["https://img.example.com/s.png".into()],
      metadata,
    })
    .await
    .unwrap();

  assert_eq!(updated.name, "Ichiran Shibuya");
  assert_eq!(updated.images.len(), 1);
  assert_eq!(updated.metadata["area"], serde_json::json!("Shibuya"));
}

#[tokio::test]
async fn subject_with_reviews_cannot_be_deleted() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    owner.user_id,
    comment:    None,
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[4]),
  })
  .await
  .unwrap();

  let err = s.delete_subject(subject.subject_id).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::SubjectHasReviews)));

  // Removing the review unblocks deletion.
  s.delete_review(subject.subject_id, owner.user_id)
    .await
    .unwrap();
  s.delete_subject(subject.subject_id).await.unwrap();
  assert!(
    s.get_subject(group.group_id, subject.subject_id)
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn review_total_is_rounded_mean() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste", "Price"]).await;
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  let review = s
    .create_review(NewReview {
      subject_id: subject.subject_id,
      user_id:    owner.user_id,
      comment:    Some("good but expensive".into()),
      images:     Vec::new(),
      scores:     scores_for(&criteria, &[4, 2]),
    })
    .await
    .unwrap();

  assert_eq!(review.total_score, 3.00);

  let listed = s.list_reviews(subject.subject_id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].review.total_score, 3.00);
  assert_eq!(listed[0].author.user_id, owner.user_id);
  assert_eq!(listed[0].scores.len(), 2);
  assert_eq!(listed[0].scores[0].name, "Taste");
}

#[tokio::test]
async fn second_review_by_same_user_is_conflict() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    owner.user_id,
    comment:    None,
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[4]),
  })
  .await
  .unwrap();

  let err = s
    .create_review(NewReview {
      subject_id: subject.subject_id,
      user_id:    owner.user_id,
      comment:    Some("changed my mind".into()),
      images:     Vec::new(),
      scores:     scores_for(&criteria, &[1]),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::AlreadyReviewed)));
}

#[tokio::test]
async fn review_requires_every_criterion() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste", "Price"]).await;
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  let err = s
    .create_review(NewReview {
      subject_id: subject.subject_id,
      user_id:    owner.user_id,
      comment:    None,
      images:     Vec::new(),
      scores:     scores_for(&criteria[..1], &[4]),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn review_rejects_out_of_range_scores() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  let err = s
    .create_review(NewReview {
      subject_id: subject.subject_id,
      user_id:    owner.user_id,
      comment:    None,
      images:     Vec::new(),
      scores:     scores_for(&criteria, &[0]),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn update_review_replaces_scores_and_total() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste", "Price"]).await;
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    owner.user_id,
    comment:    Some("first take".into()),
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[4, 2]),
  })
  .await
  .unwrap();

  let updated = s
    .update_review(subject.subject_id, owner.user_id, ReviewUpdate {
      comment: Some("revisited".into()),
      images:  Vec::new(),
      scores:  scores_for(&criteria, &[5, 4]),
    })
    .await
    .unwrap();

  assert_eq!(updated.total_score, 4.50);
  assert_eq!(updated.comment.as_deref(), Some("revisited"));

  let stored = s
    .get_user_review(subject.subject_id, owner.user_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.scores.len(), 2);
  assert_eq!(stored.scores.iter().map(|x| x.score).max(), Some(5));
}

#[tokio::test]
async fn update_missing_review_errors() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  let err = s
    .update_review(subject.subject_id, owner.user_id, ReviewUpdate {
      comment: None,
      images:  Vec::new(),
      scores:  scores_for(&criteria, &[3]),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ReviewNotFound)));
}

#[tokio::test]
async fn deleted_review_no_longer_blocks_a_new_one() {
  let s = store().await;
  let owner = register(&s, "alice").await;
  let group = make_group(&s, &owner, &["Taste"]).await;
  let criteria = s.group_criteria(group.group_id).await.unwrap();
  let subject = make_subject(&s, group.group_id, &owner, "Ichiran").await;

  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    owner.user_id,
    comment:    None,
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[2]),
  })
  .await
  .unwrap();

  s.delete_review(subject.subject_id, owner.user_id)
    .await
    .unwrap();
  assert!(
    s.get_user_review(subject.subject_id, owner.user_id)
      .await
      .unwrap()
      .is_none()
  );
  assert!(s.list_reviews(subject.subject_id).await.unwrap().is_empty());

  // The soft-deleted review does not trip the one-review rule.
  s.create_review(NewReview {
    subject_id: subject.subject_id,
    user_id:    owner.user_id,
    comment:    Some("second chance".into()),
    images:     Vec::new(),
    scores:     scores_for(&criteria, &[5]),
  })
  .await
  .unwrap();
}
