//! HTTP adapter for the billing webhook endpoint.
//!
//! Exposes webhook reconciliation via REST:
//! - `POST /api/webhooks/stripe` - Verify and reconcile Stripe webhooks

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, WebhookAckResponse};
pub use handlers::{handle_stripe_webhook, BillingAppState, WebhookApiError};
pub use routes::webhook_routes;
