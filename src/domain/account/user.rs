//! User aggregate - account identity plus billing entitlement state.
//!
//! The user row is the durable record webhook reconciliation converges on.
//! Billing identifiers arrive from Stripe events; plan and status mirror
//! the provider's view of the subscription.

use crate::domain::billing::{is_entitled, Plan, PlanResolution};
use crate::domain::foundation::{Timestamp, UserId};

/// The User aggregate root.
///
/// Fields are public so repository implementations can reconstitute the
/// aggregate from database rows with a struct literal.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Unique email, used as the fallback join key when no customer id
    /// has been attached yet.
    pub email: String,
    /// Provider customer id (cus_xxx), attached on first resolution.
    pub billing_customer_id: Option<String>,
    /// Provider subscription id (sub_xxx). Only ids that exist in the
    /// current provider environment are ever stored here.
    pub billing_subscription_id: Option<String>,
    pub plan: Plan,
    /// Raw provider subscription status ("active", "past_due", ...).
    /// Kept as free text so new provider statuses pass through unchanged.
    pub plan_status: Option<String>,
    pub current_period_end: Option<Timestamp>,
    /// Start of the current lapse episode. Written once per episode,
    /// cleared on reactivation.
    pub subscription_lapsed_at: Option<Timestamp>,
    pub subscription_reactivated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Creates a new user on the default plan with no billing linkage.
    pub fn new(email: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: UserId::new(),
            email: email.into(),
            billing_customer_id: None,
            billing_subscription_id: None,
            plan: Plan::default(),
            plan_status: None,
            current_period_end: None,
            subscription_lapsed_at: None,
            subscription_reactivated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a plan resolution and provider status from an event.
    ///
    /// An unmapped price leaves the current plan untouched; the status
    /// mirror is always updated.
    pub fn apply_entitlement(&mut self, resolution: PlanResolution, status: impl Into<String>) {
        if let PlanResolution::Plan(plan) = resolution {
            self.plan = plan;
        }
        self.plan_status = Some(status.into());
        self.updated_at = Timestamp::now();
    }

    /// Records the start of a lapse episode.
    ///
    /// The lapse timestamp marks when entitlement was first lost and is
    /// not moved by later lapsed-state events in the same episode.
    pub fn record_lapse(&mut self, now: Timestamp) {
        if self.subscription_lapsed_at.is_none() {
            self.subscription_lapsed_at = Some(now);
        }
        self.subscription_reactivated_at = None;
        self.updated_at = Timestamp::now();
    }

    /// Records a return to entitled state, closing any lapse episode.
    pub fn record_reactivation(&mut self, now: Timestamp) {
        self.subscription_lapsed_at = None;
        self.subscription_reactivated_at = Some(now);
        self.updated_at = Timestamp::now();
    }

    /// Returns true if the mirrored provider status grants entitlement.
    pub fn is_entitled(&self) -> bool {
        self.plan_status
            .as_deref()
            .map(is_entitled)
            .unwrap_or(false)
    }
}
