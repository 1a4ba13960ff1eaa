//! Profile aggregate - the published page whose visibility tracks entitlement.
//!
//! A profile is unpublished when its owner's subscription lapses and
//! republished when entitlement returns, provided nothing else took it down
//! in the meantime.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProfileId, Timestamp, UserId};

/// Days an unpublished profile is retained before deletion is eligible.
pub const LAPSE_RETENTION_DAYS: i64 = 90;

/// Public visibility state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Public,
    Unpublished,
    Deleted,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Unpublished => "UNPUBLISHED",
            Visibility::Deleted => "DELETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUBLIC" => Some(Visibility::Public),
            "UNPUBLISHED" => Some(Visibility::Unpublished),
            "DELETED" => Some(Visibility::Deleted),
            _ => None,
        }
    }
}

/// Why a profile is currently unpublished.
///
/// Reconciliation only reverses its own unpublishes; any other reason
/// blocks automatic republish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnpublishReason {
    None,
    SubscriptionLapsed,
    Takedown,
}

impl UnpublishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnpublishReason::None => "NONE",
            UnpublishReason::SubscriptionLapsed => "SUBSCRIPTION_LAPSED",
            UnpublishReason::Takedown => "TAKEDOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(UnpublishReason::None),
            "SUBSCRIPTION_LAPSED" => Some(UnpublishReason::SubscriptionLapsed),
            "TAKEDOWN" => Some(UnpublishReason::Takedown),
            _ => None,
        }
    }
}

impl Default for UnpublishReason {
    fn default() -> Self {
        UnpublishReason::None
    }
}

/// The Profile aggregate root.
///
/// Fields are public so repository implementations can reconstitute the
/// aggregate from database rows with a struct literal.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub visibility: Visibility,
    pub unpublished_at: Option<Timestamp>,
    pub unpublish_reason: UnpublishReason,
    /// Deadline after which an unpublished profile may be deleted.
    pub retention_until: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    /// Lock stamp taken by the deletion job while it works on this row.
    pub deletion_job_locked_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Profile {
    /// Creates a new public profile for a user.
    pub fn new(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            id: ProfileId::new(),
            user_id,
            visibility: Visibility::Public,
            unpublished_at: None,
            unpublish_reason: UnpublishReason::None,
            retention_until: None,
            deleted_at: None,
            deletion_job_locked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Takes the profile down because entitlement was lost.
    ///
    /// Stamps the retention deadline and cancels any scheduled deletion
    /// so the retention window owns the profile's fate from here.
    pub fn unpublish_for_lapse(&mut self, reason: UnpublishReason, now: Timestamp) {
        self.visibility = Visibility::Unpublished;
        self.unpublished_at = Some(now);
        self.unpublish_reason = reason;
        self.retention_until = Some(now.add_days(LAPSE_RETENTION_DAYS));
        self.deleted_at = None;
        self.deletion_job_locked_at = None;
        self.updated_at = Timestamp::now();
    }

    /// Republishes the profile if reconciliation was what unpublished it.
    ///
    /// Profiles taken down for any other reason are left untouched.
    /// Returns true if the profile was republished.
    pub fn republish_if_lapsed(&mut self) -> bool {
        if self.unpublish_reason != UnpublishReason::SubscriptionLapsed {
            return false;
        }

        self.visibility = Visibility::Public;
        self.unpublished_at = None;
        self.unpublish_reason = UnpublishReason::None;
        self.retention_until = None;
        self.updated_at = Timestamp::now();
        true
    }
}
