//! Stripe billing provider gateway.
//!
//! Implements the read-only `BillingProvider` port against the Stripe
//! REST API. Reconciliation consults the API for exactly two things:
//! resolving a customer that is not cached locally, and validating that
//! a subscription id exists in the configured key's environment.
//!
//! # Security
//!
//! - API key held in `secrecy::SecretString`, sent via HTTP basic auth
//! - Every request carries a bounded timeout; a slow provider fails the
//!   lookup instead of hanging the webhook delivery

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::ports::{BillingProvider, ProviderCustomer, ProviderError, ProviderSubscription};

use super::api_types::{StripeCustomer, StripeSubscription};

/// Stripe API client configuration.
#[derive(Clone)]
pub struct StripeApiConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl StripeApiConfig {
    /// Create a new Stripe API configuration.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            timeout,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe gateway implementing the `BillingProvider` port.
pub struct StripeGateway {
    config: StripeApiConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway with the given configuration.
    pub fn new(config: StripeApiConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Perform an authenticated GET, mapping 404 to `Ok(None)`.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ProviderError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::timeout(format!("Stripe request timed out: {}", e))
                } else {
                    ProviderError::network(e.to_string())
                }
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, path, "Stripe API request failed");
            return Err(error_for_status(status, error_text));
        }

        let parsed = response.json::<T>().await.map_err(|e| {
            ProviderError::invalid_response(format!("Failed to parse Stripe response: {}", e))
        })?;

        Ok(Some(parsed))
    }
}

#[async_trait]
impl BillingProvider for StripeGateway {
    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProviderCustomer>, ProviderError> {
        let path = format!("/v1/customers/{}", customer_id);
        let customer: Option<StripeCustomer> = self.get_json(&path).await?;

        Ok(customer.and_then(customer_to_port))
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, ProviderError> {
        let path = format!("/v1/subscriptions/{}", subscription_id);
        let subscription: Option<StripeSubscription> = self.get_json(&path).await?;

        Ok(subscription.map(subscription_to_port))
    }
}

/// Convert a wire customer to the port representation.
///
/// Deleted customers map to `None`: Stripe answers with a stub object
/// rather than a 404, but for reconciliation purposes the customer is
/// gone either way.
fn customer_to_port(customer: StripeCustomer) -> Option<ProviderCustomer> {
    if customer.deleted {
        return None;
    }

    Some(ProviderCustomer {
        id: customer.id,
        email: customer.email,
    })
}

/// Convert a wire subscription to the port representation.
fn subscription_to_port(subscription: StripeSubscription) -> ProviderSubscription {
    ProviderSubscription {
        id: subscription.id,
        customer_id: subscription.customer,
        status: subscription.status,
        current_period_end: Some(subscription.current_period_end),
        cancel_at_period_end: subscription.cancel_at_period_end,
    }
}

/// Map a non-success Stripe status to a provider error.
fn error_for_status(status: reqwest::StatusCode, body: String) -> ProviderError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            ProviderError::authentication(format!("Stripe rejected credentials: {}", body))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::rate_limited("Stripe rate limit exceeded")
        }
        _ => ProviderError::api(format!("Stripe API error ({}): {}", status, body)),
    }
}
