//! HTTP handlers for the billing webhook endpoint.
//!
//! These handlers connect Axum routes to the webhook verification and
//! reconciliation layers. The raw request body is passed to verification
//! exactly as received; any re-serialization would break the signature.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::response::IntoResponse;
use tracing::{error, info, warn};

use crate::application::handlers::{ProcessOutcome, ProcessStripeEventHandler};
use crate::domain::billing::{WebhookError, WebhookVerifier};

use super::dto::{ErrorResponse, WebhookAckResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all webhook dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub verifier: Arc<WebhookVerifier>,
    pub processor: Arc<ProcessStripeEventHandler>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handler
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe - Verify and reconcile a Stripe webhook event
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    // Extract Stripe signature header
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    let event = state.verifier.verify_and_parse(&body, signature)?;

    let event_id = event.id.clone();
    let event_type = event.event_type.clone();
    let live = event.is_live();
    let outcome = state.processor.handle(event).await?;

    match &outcome {
        ProcessOutcome::Applied => {
            info!(
                event_id = %event_id,
                event_type = %event_type,
                live,
                "webhook event applied"
            );
        }
        ProcessOutcome::Acknowledged(reason) => {
            warn!(
                event_id = %event_id,
                event_type = %event_type,
                live,
                reason = %reason,
                "webhook event acknowledged without effect"
            );
        }
        ProcessOutcome::AlreadyProcessed => {
            info!(event_id = %event_id, "webhook event already processed");
        }
    }

    Ok(Json(WebhookAckResponse::ok()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
///
/// Status codes come from `WebhookError::status_code()` and drive the
/// provider's retry behavior: 4xx terminates the delivery, 5xx makes
/// Stripe redeliver.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let error_code = match &self.0 {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_WEBHOOK_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::MalformedEvent { .. } => "MALFORMED_EVENT",
            WebhookError::Provider(_) => "PROVIDER_ERROR",
            WebhookError::Database(_) => "INTERNAL_ERROR",
        };

        let status = self.0.status_code();
        if status.is_server_error() {
            error!(error = %self.0, "webhook processing failed, provider will retry");
        } else {
            warn!(error = %self.0, "webhook request rejected");
        }

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
