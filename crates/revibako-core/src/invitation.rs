//! Invitations — pending requests to join a group.
//!
//! The invited user is addressed by display handle. Only the `pending`
//! status gates behaviour (a duplicate pending invitation is a conflict);
//! the other states exist for bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
  Pending,
  Accepted,
  Declined,
}

/// A recorded invitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
  pub invitation_id:  Uuid,
  pub group_id:       Uuid,
  pub inviter_id:     Uuid,
  /// Display handle of the invited user, as entered by the inviter.
  pub invited_handle: String,
  pub status:         InvitationStatus,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ReviewStore::create_invitation`].
#[derive(Debug, Clone)]
pub struct NewInvitation {
  pub group_id:       Uuid,
  pub inviter_id:     Uuid,
  pub invited_handle: String,
}
