//! Billing provider port for subscription lookups.
//!
//! Defines the read-only contract the reconciliation engine needs from the
//! payment provider (e.g., Stripe). Webhooks carry most of the state; the
//! provider API is only consulted to validate identifiers against the
//! current environment.
//!
//! # Design
//!
//! - **Read-only**: Reconciliation never mutates provider state
//! - **Fail closed**: Lookups have bounded timeouts; ambiguity is an error
//! - **Environment-scoped**: "not found" answers are authoritative for the
//!   configured API key's environment

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for billing provider lookups.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Fetch a customer by provider ID.
    ///
    /// Returns `Ok(None)` if the customer does not exist in this
    /// environment or has been deleted.
    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProviderCustomer>, ProviderError>;

    /// Fetch a subscription by provider ID.
    ///
    /// Returns `Ok(None)` if the subscription does not exist in this
    /// environment.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, ProviderError>;
}

/// Customer as reported by the billing provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCustomer {
    /// Provider's customer ID.
    pub id: String,

    /// Customer email, if the provider has one on file.
    pub email: Option<String>,
}

/// Subscription as reported by the billing provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    /// Provider's subscription ID.
    pub id: String,

    /// Provider's customer ID.
    pub customer_id: String,

    /// Raw provider status string.
    pub status: String,

    /// Current billing period end (Unix timestamp).
    pub current_period_end: Option<i64>,

    /// Whether the subscription cancels at period end.
    pub cancel_at_period_end: bool,
}

/// Errors from billing provider lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    /// Error code for categorization.
    pub code: ProviderErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Whether the lookup can be retried.
    pub retryable: bool,
}

impl ProviderError {
    /// Create a new provider error.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Timeout, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationError, message)
    }

    /// Create a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Create a provider API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ApiError, message)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Request exceeded its deadline.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Rate limit exceeded.
    RateLimited,

    /// Response body did not match the expected shape.
    InvalidResponse,

    /// Provider-side API error.
    ApiError,
}

impl ProviderErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorCode::NetworkError
                | ProviderErrorCode::Timeout
                | ProviderErrorCode::RateLimited
                | ProviderErrorCode::ApiError
        )
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorCode::NetworkError => "network_error",
            ProviderErrorCode::Timeout => "timeout",
            ProviderErrorCode::AuthenticationError => "authentication_error",
            ProviderErrorCode::RateLimited => "rate_limited",
            ProviderErrorCode::InvalidResponse => "invalid_response",
            ProviderErrorCode::ApiError => "api_error",
        };
        write!(f, "{}", s)
    }
}
