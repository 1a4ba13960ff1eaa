//! Stripe billing provider adapter.
//!
//! Implements the `BillingProvider` port against the Stripe REST API.
//! The adapter is strictly read-only: reconciliation retrieves customers
//! and subscriptions to validate webhook-supplied identifiers, and never
//! mutates provider state.
//!
//! Webhook signature verification does not live here; it operates on raw
//! request bytes before any provider type exists and belongs to the
//! domain (`domain::billing::WebhookVerifier`).

mod api_types;
mod gateway;

pub use api_types::{StripeCustomer, StripePrice, StripeSubscription, StripeSubscriptionItem};
pub use gateway::{StripeApiConfig, StripeGateway};
