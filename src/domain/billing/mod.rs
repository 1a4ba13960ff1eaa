//! Billing domain module.
//!
//! Handles subscription entitlement, price-to-plan resolution, and
//! Stripe webhook verification and decoding.
//!
//! # Module Structure
//!
//! - `plan` - Plan subscription tiers
//! - `price_book` - Provider price id to plan mapping
//! - `entitlement` - Subscription status entitlement rules
//! - `stripe_event` - Webhook envelope and payload types
//! - `webhook_verifier` - Signature verification
//! - `webhook_errors` - Error taxonomy and retry semantics

mod entitlement;
mod plan;
mod price_book;
mod stripe_event;
mod webhook_errors;
mod webhook_verifier;

pub use entitlement::{is_entitled, ENTITLED_STATUSES};
pub use plan::Plan;
pub use price_book::{PlanResolution, PriceBook};
pub use stripe_event::{
    BillingEvent, CheckoutSessionObject, InvoiceLine, InvoiceLines, InvoiceObject, PriceRef,
    StripeEvent, StripeEventData, StripeEventType, SubscriptionItem, SubscriptionItems,
    SubscriptionObject,
};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
