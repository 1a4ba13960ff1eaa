//! Billing configuration (Stripe)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::billing::{Plan, PriceBook};

use super::error::ValidationError;
use super::server::Environment;

/// Billing configuration (Stripe)
///
/// Carries the provider credentials, the webhook signing secret, and the
/// price-id-to-plan table. The `LITE` tier is free and has no price ids;
/// every paid tier may carry a monthly and an annual price id.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Stripe API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Provider API request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Stripe price ID for PLUS monthly
    pub plus_monthly_price_id: Option<String>,

    /// Stripe price ID for PLUS annual
    pub plus_annual_price_id: Option<String>,

    /// Stripe price ID for PRO monthly
    pub pro_monthly_price_id: Option<String>,

    /// Stripe price ID for PRO annual
    pub pro_annual_price_id: Option<String>,

    /// Stripe price ID for BUSINESS monthly
    pub business_monthly_price_id: Option<String>,

    /// Stripe price ID for BUSINESS annual
    pub business_annual_price_id: Option<String>,

    /// Stripe price ID for ENTERPRISE monthly
    pub enterprise_monthly_price_id: Option<String>,

    /// Stripe price ID for ENTERPRISE annual
    pub enterprise_annual_price_id: Option<String>,
}

impl BillingConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_live_")
    }

    /// Get provider request timeout as Duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Build the price-to-plan table from the configured price ids
    pub fn price_book(&self) -> PriceBook {
        let pairs = [
            (&self.plus_monthly_price_id, Plan::Plus),
            (&self.plus_annual_price_id, Plan::Plus),
            (&self.pro_monthly_price_id, Plan::Pro),
            (&self.pro_annual_price_id, Plan::Pro),
            (&self.business_monthly_price_id, Plan::Business),
            (&self.business_annual_price_id, Plan::Business),
            (&self.enterprise_monthly_price_id, Plan::Enterprise),
            (&self.enterprise_annual_price_id, Plan::Enterprise),
        ];
        PriceBook::new(
            pairs
                .into_iter()
                .filter_map(|(price_id, plan)| price_id.clone().map(|id| (id, plan))),
        )
    }

    /// Validate billing configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.stripe_api_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.expose_secret().starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self
            .stripe_webhook_secret
            .expose_secret()
            .starts_with("whsec_")
        {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        // A live key outside production reconciles real accounts from a
        // development process.
        if self.is_live_mode() && *environment != Environment::Production {
            return Err(ValidationError::LiveKeyOutsideProduction);
        }

        if self.provider_timeout_secs == 0 || self.provider_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }

        // With no price ids every resolution is Unmapped and nobody can
        // ever be upgraded.
        if self.price_book().is_empty() {
            return Err(ValidationError::EmptyPriceBook);
        }

        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: SecretString::new(String::new()),
            stripe_webhook_secret: SecretString::new(String::new()),
            provider_timeout_secs: default_provider_timeout(),
            plus_monthly_price_id: None,
            plus_annual_price_id: None,
            pro_monthly_price_id: None,
            pro_annual_price_id: None,
            business_monthly_price_id: None,
            business_annual_price_id: None,
            enterprise_monthly_price_id: None,
            enterprise_annual_price_id: None,
        }
    }
}

fn default_provider_timeout() -> u64 {
    10
}
