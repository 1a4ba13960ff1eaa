//! Axum router configuration for the billing webhook endpoint.
//!
//! This module defines the route structure for webhook delivery and
//! wires it to the handler.

use axum::{routing::post, Router};

use super::handlers::{handle_stripe_webhook, BillingAppState};

/// Create the Stripe webhook router.
///
/// Webhook requests carry no user session; authenticity comes from the
/// signature check inside the handler.
///
/// # Routes
/// - `POST /stripe` - Verify and reconcile Stripe webhooks
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use crate::adapters::http::billing::{webhook_routes, BillingAppState};
///
/// let app_state = BillingAppState { /* ... */ };
/// let app = Router::new()
///     .nest("/api/webhooks", webhook_routes())
///     .with_state(app_state);
/// ```
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}
