//! HTTP DTOs for the billing webhook endpoint.
//!
//! These types define the JSON response structure for the webhook API.
//! They serve as the boundary between HTTP and the application layer.

use serde::Serialize;

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement body returned for every accepted webhook delivery.
///
/// Stripe only inspects the status code, but the body makes manual
/// replay and curl testing legible.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    /// Always true; the event was verified and reached a terminal outcome.
    pub received: bool,
}

impl WebhookAckResponse {
    pub fn ok() -> Self {
        Self { received: true }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an error response with details.
    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
