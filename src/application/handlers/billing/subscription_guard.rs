//! SubscriptionGuard - validates subscription ids against the current
//! billing environment before they are persisted.

use std::sync::Arc;

use tracing::warn;

use crate::ports::{BillingProvider, ProviderError};

/// Screens subscription ids carried by webhook events.
///
/// Stripe test and live environments share webhook endpoints more often
/// than anyone intends. An id minted in another environment looks valid
/// but refers to nothing here; persisting it would poison later lookups.
pub struct SubscriptionGuard {
    provider: Arc<dyn BillingProvider>,
}

impl SubscriptionGuard {
    pub fn new(provider: Arc<dyn BillingProvider>) -> Self {
        Self { provider }
    }

    /// Returns the subscription id to store, if any.
    ///
    /// - Missing or empty input short-circuits to `None` without a
    ///   provider call
    /// - An id the provider does not recognize is dropped with a warning
    /// - Transport failures propagate so the delivery is retried
    pub async fn sanitize(
        &self,
        subscription_id: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        let subscription_id = match subscription_id {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(None),
        };

        match self.provider.get_subscription(subscription_id).await? {
            Some(subscription) => Ok(Some(subscription.id)),
            None => {
                warn!(
                    subscription_id = %subscription_id,
                    "subscription id not found in current billing environment, dropping"
                );
                Ok(None)
            }
        }
    }
}
