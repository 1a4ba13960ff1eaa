//! CustomerResolver - maps billing customer ids to local user accounts.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::domain::account::User;
use crate::domain::foundation::DomainError;
use crate::ports::{BillingProvider, EntitlementRepository, ProviderError};

/// Errors from customer resolution.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No local account could be tied to the customer id.
    #[error("no user found for billing customer {customer_id}")]
    NotFound { customer_id: String },

    /// Provider lookup failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Repository read or write failed.
    #[error(transparent)]
    Repository(#[from] DomainError),
}

/// Resolves the user a webhook event belongs to.
///
/// Checkout and subscription creation can race webhook delivery, so the
/// customer id in an event may not be attached to any account yet. The
/// resolver falls back to the customer's email (unique per account) and
/// heals the linkage for future events.
pub struct CustomerResolver {
    repository: Arc<dyn EntitlementRepository>,
    provider: Arc<dyn BillingProvider>,
}

impl CustomerResolver {
    pub fn new(
        repository: Arc<dyn EntitlementRepository>,
        provider: Arc<dyn BillingProvider>,
    ) -> Self {
        Self {
            repository,
            provider,
        }
    }

    /// Resolution order:
    ///
    /// 1. Local lookup by attached customer id
    /// 2. Provider fetch to learn the customer's email
    /// 3. Local lookup by that email, backfilling the customer id
    ///
    /// # Errors
    ///
    /// - `NotFound` if every step comes up empty (expected for customers
    ///   created outside this deployment; callers acknowledge the event)
    /// - `Provider` / `Repository` on transport failures (callers let the
    ///   delivery be retried)
    pub async fn resolve(&self, customer_id: &str) -> Result<User, ResolutionError> {
        if let Some(user) = self
            .repository
            .find_user_by_customer_id(customer_id)
            .await?
        {
            return Ok(user);
        }

        let customer = self
            .provider
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| ResolutionError::NotFound {
                customer_id: customer_id.to_string(),
            })?;

        let email = customer.email.ok_or_else(|| ResolutionError::NotFound {
            customer_id: customer_id.to_string(),
        })?;

        match self.repository.find_user_by_email(&email).await? {
            Some(mut user) => {
                self.repository
                    .attach_customer_id(&user.id, customer_id)
                    .await?;
                user.billing_customer_id = Some(customer_id.to_string());
                info!(
                    customer_id = %customer_id,
                    user_id = %user.id,
                    "attached billing customer id via email match"
                );
                Ok(user)
            }
            None => Err(ResolutionError::NotFound {
                customer_id: customer_id.to_string(),
            }),
        }
    }
}
