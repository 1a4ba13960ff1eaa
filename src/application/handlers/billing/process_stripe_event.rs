//! ProcessStripeEventHandler - reconciles verified webhook events into
//! durable entitlement state.
//!
//! The handler is the convergence point for out-of-order, duplicated
//! webhook delivery: every event is reduced to plan, status, and profile
//! visibility effects that are safe to apply in any order and any number
//! of times.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::{
    is_entitled, BillingEvent, CheckoutSessionObject, InvoiceObject, Plan, PriceBook, StripeEvent,
    SubscriptionObject, WebhookError,
};
use crate::domain::account::User;
use crate::domain::foundation::Timestamp;
use crate::domain::profile::UnpublishReason;
use crate::ports::{
    BillingProvider, EntitlementRepository, SaveResult, WebhookEventRecord, WebhookEventRepository,
};

use super::customer_resolver::{CustomerResolver, ResolutionError};
use super::lifecycle_effects::LifecycleEffects;
use super::subscription_guard::SubscriptionGuard;

/// Why an event was acknowledged without applying any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Event type this service does not reconcile.
    UnknownEventType(String),
    /// No local account could be tied to the event's customer.
    CustomerNotFound(String),
    /// Event carries no customer id at all.
    MissingCustomer,
    /// Price id is not in the configured plan mapping.
    UnmappedPrice(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnknownEventType(event_type) => {
                write!(f, "unhandled event type {}", event_type)
            }
            SkipReason::CustomerNotFound(customer_id) => {
                write!(f, "no user for billing customer {}", customer_id)
            }
            SkipReason::MissingCustomer => write!(f, "event carries no customer id"),
            SkipReason::UnmappedPrice(price_id) => {
                write!(f, "price {} not mapped to a plan", price_id)
            }
        }
    }
}

/// Terminal outcome of processing one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Event effects were applied and persisted.
    Applied,
    /// Event was acknowledged without state changes.
    Acknowledged(SkipReason),
    /// Event id was seen before; handlers did not run.
    AlreadyProcessed,
}

/// Handler for verified Stripe webhook events.
///
/// Dispatches by event type, resolves the affected user, and applies
/// lapse or reactivation effects. Transient failures surface as errors
/// so the delivery is retried; expected misses are acknowledged.
pub struct ProcessStripeEventHandler {
    webhook_events: Arc<dyn WebhookEventRepository>,
    repository: Arc<dyn EntitlementRepository>,
    resolver: CustomerResolver,
    guard: SubscriptionGuard,
    effects: LifecycleEffects,
    price_book: Arc<PriceBook>,
}

impl ProcessStripeEventHandler {
    pub fn new(
        repository: Arc<dyn EntitlementRepository>,
        provider: Arc<dyn BillingProvider>,
        webhook_events: Arc<dyn WebhookEventRepository>,
        price_book: Arc<PriceBook>,
    ) -> Self {
        Self {
            resolver: CustomerResolver::new(repository.clone(), provider.clone()),
            guard: SubscriptionGuard::new(provider),
            effects: LifecycleEffects::new(repository.clone()),
            repository,
            webhook_events,
            price_book,
        }
    }

    /// Processes one verified event to a terminal outcome.
    ///
    /// Deliveries already in the ledger are skipped without re-running
    /// handlers. Only terminal outcomes are recorded; errors leave no
    /// ledger entry so the provider's retry is processed normally.
    pub async fn handle(&self, event: StripeEvent) -> Result<ProcessOutcome, WebhookError> {
        if self
            .webhook_events
            .find_by_event_id(&event.id)
            .await?
            .is_some()
        {
            info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "duplicate webhook delivery, skipping"
            );
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        let billing_event = BillingEvent::from_envelope(&event)?;

        let outcome = match billing_event {
            BillingEvent::CheckoutCompleted(session) => {
                self.handle_checkout_completed(&session).await?
            }
            BillingEvent::SubscriptionCreated(subscription)
            | BillingEvent::SubscriptionUpdated(subscription) => {
                self.handle_subscription_change(&subscription).await?
            }
            BillingEvent::SubscriptionDeleted(subscription) => {
                self.handle_subscription_deleted(&subscription).await?
            }
            BillingEvent::InvoicePaymentSucceeded(invoice) => {
                self.handle_invoice_paid(&invoice).await?
            }
            BillingEvent::InvoicePaymentFailed(invoice) => {
                self.handle_invoice_failed(&invoice).await?
            }
            BillingEvent::Unknown { event_type } => {
                info!(event_id = %event.id, event_type = %event_type, "acknowledging unhandled event type");
                ProcessOutcome::Acknowledged(SkipReason::UnknownEventType(event_type))
            }
        };

        let payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
        let record = match &outcome {
            ProcessOutcome::Applied => {
                WebhookEventRecord::processed(&event.id, &event.event_type, payload)
            }
            ProcessOutcome::Acknowledged(reason) => {
                WebhookEventRecord::ignored(&event.id, &event.event_type, reason.to_string(), payload)
            }
            ProcessOutcome::AlreadyProcessed => return Ok(outcome),
        };

        if self.webhook_events.save(record).await? == SaveResult::AlreadyExists {
            warn!(
                event_id = %event.id,
                "concurrent delivery recorded this event first"
            );
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        Ok(outcome)
    }

    /// Checkout establishes the purchased plan from session metadata and
    /// treats the subscription as active.
    async fn handle_checkout_completed(
        &self,
        session: &CheckoutSessionObject,
    ) -> Result<ProcessOutcome, WebhookError> {
        let customer_id = match session.customer.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                warn!(session_id = %session.id, "checkout session has no customer");
                return Ok(ProcessOutcome::Acknowledged(SkipReason::MissingCustomer));
            }
        };

        let mut user = match self.resolve_user(customer_id).await? {
            Some(user) => user,
            None => {
                return Ok(ProcessOutcome::Acknowledged(SkipReason::CustomerNotFound(
                    customer_id.to_string(),
                )))
            }
        };

        let price_id = session.metadata_price_id();
        let resolution = self.price_book.resolve(price_id);
        if resolution.plan().is_none() {
            let price_id = price_id.unwrap_or("<missing>");
            warn!(
                session_id = %session.id,
                price_id = %price_id,
                "checkout price not mapped to a plan"
            );
            return Ok(ProcessOutcome::Acknowledged(SkipReason::UnmappedPrice(
                price_id.to_string(),
            )));
        }

        let subscription_id = self.guard.sanitize(session.subscription.as_deref()).await?;

        user.apply_entitlement(resolution, "active");
        user.billing_subscription_id = subscription_id;
        self.effects.reactivate(&mut user, Timestamp::now()).await?;

        Ok(ProcessOutcome::Applied)
    }

    /// Subscription created and updated events carry the authoritative
    /// status; the entitlement set decides lapse versus reactivation.
    async fn handle_subscription_change(
        &self,
        subscription: &SubscriptionObject,
    ) -> Result<ProcessOutcome, WebhookError> {
        let mut user = match self.resolve_user(&subscription.customer).await? {
            Some(user) => user,
            None => {
                return Ok(ProcessOutcome::Acknowledged(SkipReason::CustomerNotFound(
                    subscription.customer.clone(),
                )))
            }
        };

        let resolution = self.price_book.resolve(subscription.first_price_id());
        if resolution.plan().is_none() {
            warn!(
                subscription_id = %subscription.id,
                price_id = subscription.first_price_id().unwrap_or("<missing>"),
                "subscription price not mapped, keeping current plan"
            );
        }

        let subscription_id = self.guard.sanitize(Some(subscription.id.as_str())).await?;

        user.apply_entitlement(resolution, subscription.status.clone());
        user.billing_subscription_id = subscription_id;
        if let Some(period_end) = subscription.current_period_end {
            user.current_period_end = Some(Timestamp::from_unix_secs(period_end));
        }

        let now = Timestamp::now();
        if is_entitled(&subscription.status) {
            self.effects.reactivate(&mut user, now).await?;
        } else {
            self.effects
                .lapse(&mut user, UnpublishReason::SubscriptionLapsed, now)
                .await?;
        }

        Ok(ProcessOutcome::Applied)
    }

    /// Deletion drops the user back to the default plan and lapses.
    async fn handle_subscription_deleted(
        &self,
        subscription: &SubscriptionObject,
    ) -> Result<ProcessOutcome, WebhookError> {
        let mut user = match self.resolve_user(&subscription.customer).await? {
            Some(user) => user,
            None => {
                return Ok(ProcessOutcome::Acknowledged(SkipReason::CustomerNotFound(
                    subscription.customer.clone(),
                )))
            }
        };

        user.apply_entitlement(crate::domain::billing::PlanResolution::Plan(Plan::Lite), "canceled");
        user.billing_subscription_id = None;
        self.effects
            .lapse(&mut user, UnpublishReason::SubscriptionLapsed, Timestamp::now())
            .await?;

        Ok(ProcessOutcome::Applied)
    }

    /// A paid invoice is proof of an active subscription regardless of
    /// what stale events said before or after.
    async fn handle_invoice_paid(
        &self,
        invoice: &InvoiceObject,
    ) -> Result<ProcessOutcome, WebhookError> {
        let customer_id = match invoice.customer.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                warn!(invoice_id = %invoice.id, "invoice has no customer");
                return Ok(ProcessOutcome::Acknowledged(SkipReason::MissingCustomer));
            }
        };

        let mut user = match self.resolve_user(customer_id).await? {
            Some(user) => user,
            None => {
                return Ok(ProcessOutcome::Acknowledged(SkipReason::CustomerNotFound(
                    customer_id.to_string(),
                )))
            }
        };

        let resolution = self.price_book.resolve(invoice.first_price_id());
        if resolution.plan().is_none() {
            warn!(
                invoice_id = %invoice.id,
                price_id = invoice.first_price_id().unwrap_or("<missing>"),
                "invoice price not mapped, keeping current plan"
            );
        }

        let subscription_id = self.guard.sanitize(invoice.subscription.as_deref()).await?;

        user.apply_entitlement(resolution, "active");
        if subscription_id.is_some() {
            user.billing_subscription_id = subscription_id;
        }
        self.effects.reactivate(&mut user, Timestamp::now()).await?;

        Ok(ProcessOutcome::Applied)
    }

    /// Payment failure only mirrors the status; Stripe keeps retrying the
    /// charge and the subscription events drive any lapse.
    async fn handle_invoice_failed(
        &self,
        invoice: &InvoiceObject,
    ) -> Result<ProcessOutcome, WebhookError> {
        let customer_id = match invoice.customer.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                warn!(invoice_id = %invoice.id, "invoice has no customer");
                return Ok(ProcessOutcome::Acknowledged(SkipReason::MissingCustomer));
            }
        };

        let mut user = match self.resolve_user(customer_id).await? {
            Some(user) => user,
            None => {
                return Ok(ProcessOutcome::Acknowledged(SkipReason::CustomerNotFound(
                    customer_id.to_string(),
                )))
            }
        };

        user.apply_entitlement(crate::domain::billing::PlanResolution::Unmapped, "past_due");
        self.repository.update_user(&user).await?;

        Ok(ProcessOutcome::Applied)
    }

    /// Maps an expected resolution miss to `None` and lets failures
    /// propagate for retry.
    async fn resolve_user(&self, customer_id: &str) -> Result<Option<User>, WebhookError> {
        match self.resolver.resolve(customer_id).await {
            Ok(user) => Ok(Some(user)),
            Err(ResolutionError::NotFound { customer_id }) => {
                warn!(customer_id = %customer_id, "no user for billing customer, acknowledging event");
                Ok(None)
            }
            Err(ResolutionError::Provider(e)) => Err(WebhookError::from(e)),
            Err(ResolutionError::Repository(e)) => Err(WebhookError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::application::handlers::billing::test_support::{
        MockBillingProvider, MockEntitlementRepository, MockWebhookEventRepository,
    };
    use crate::domain::billing::StripeEventBuilder;
    use crate::domain::profile::{Profile, Visibility, LAPSE_RETENTION_DAYS};

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn price_book() -> Arc<PriceBook> {
        Arc::new(PriceBook::new([
            ("price_plus_monthly".to_string(), Plan::Plus),
            ("price_pro_monthly".to_string(), Plan::Pro),
        ]))
    }

    fn handler(
        repo: &Arc<MockEntitlementRepository>,
        provider: &Arc<MockBillingProvider>,
        ledger: &Arc<MockWebhookEventRepository>,
    ) -> ProcessStripeEventHandler {
        ProcessStripeEventHandler::new(
            repo.clone(),
            provider.clone(),
            ledger.clone(),
            price_book(),
        )
    }

    fn linked_user(customer_id: &str) -> User {
        let mut user = User::new("alex@example.com");
        user.billing_customer_id = Some(customer_id.to_string());
        user
    }

    fn subscription_event(id: &str, status: &str, price_id: &str) -> StripeEvent {
        StripeEventBuilder::new()
            .id(id)
            .event_type("customer.subscription.updated")
            .object(json!({
                "id": "sub_123",
                "customer": "cus_123",
                "status": status,
                "current_period_end": 1767225600,
                "items": {"data": [{"price": {"id": price_id}}]}
            }))
            .build()
    }

    fn assert_retention_is_ninety_days(profile: &Profile) {
        let retention = profile.retention_until.expect("retention must be stamped");
        let expected = Timestamp::now().add_days(LAPSE_RETENTION_DAYS);
        let drift = (retention.as_unix_secs() - expected.as_unix_secs()).abs();
        assert!(drift <= 2, "retention drifted {}s from 90 days", drift);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription Change Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn active_subscription_upgrades_plan_and_keeps_profile_public() {
        let user = linked_user("cus_123");
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider =
            Arc::new(MockBillingProvider::new().with_subscription("sub_123", "cus_123", "active"));
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let outcome = handler
            .handle(subscription_event("evt_1", "active", "price_plus_monthly"))
            .await
            .unwrap();

        assert_eq!(outcome, ProcessOutcome::Applied);
        let stored = &repo.get_users()[0];
        assert_eq!(stored.plan, Plan::Plus);
        assert_eq!(stored.plan_status.as_deref(), Some("active"));
        assert_eq!(stored.billing_subscription_id.as_deref(), Some("sub_123"));
        assert!(stored.current_period_end.is_some());
        assert_eq!(repo.get_profiles()[0].visibility, Visibility::Public);

        let records = ledger.get_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, "processed");
    }

    #[tokio::test]
    async fn trialing_subscription_counts_as_entitled() {
        let user = linked_user("cus_123");
        let mut profile = Profile::new(user.id);
        profile.unpublish_for_lapse(UnpublishReason::SubscriptionLapsed, Timestamp::now());
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider = Arc::new(
            MockBillingProvider::new().with_subscription("sub_123", "cus_123", "trialing"),
        );
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        handler
            .handle(subscription_event("evt_1", "trialing", "price_plus_monthly"))
            .await
            .unwrap();

        assert_eq!(repo.get_profiles()[0].visibility, Visibility::Public);
    }

    #[tokio::test]
    async fn past_due_subscription_lapses_and_unpublishes() {
        let mut user = linked_user("cus_123");
        user.plan = Plan::Plus;
        user.plan_status = Some("active".to_string());
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider = Arc::new(
            MockBillingProvider::new().with_subscription("sub_123", "cus_123", "past_due"),
        );
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        handler
            .handle(subscription_event("evt_1", "past_due", "price_plus_monthly"))
            .await
            .unwrap();

        let stored = &repo.get_users()[0];
        let stored_profile = &repo.get_profiles()[0];
        assert_eq!(stored.plan_status.as_deref(), Some("past_due"));
        assert!(stored.subscription_lapsed_at.is_some());
        assert_eq!(stored_profile.visibility, Visibility::Unpublished);
        assert_eq!(
            stored_profile.unpublish_reason,
            UnpublishReason::SubscriptionLapsed
        );
        assert_retention_is_ninety_days(stored_profile);
        // Plan itself is not downgraded by a lapse.
        assert_eq!(stored.plan, Plan::Plus);
    }

    #[tokio::test]
    async fn unmapped_subscription_price_keeps_current_plan() {
        let mut user = linked_user("cus_123");
        user.plan = Plan::Pro;
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider =
            Arc::new(MockBillingProvider::new().with_subscription("sub_123", "cus_123", "active"));
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let outcome = handler
            .handle(subscription_event("evt_1", "active", "price_from_elsewhere"))
            .await
            .unwrap();

        // Status still applies; plan is untouched.
        assert_eq!(outcome, ProcessOutcome::Applied);
        let stored = &repo.get_users()[0];
        assert_eq!(stored.plan, Plan::Pro);
        assert_eq!(stored.plan_status.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn foreign_subscription_id_is_not_persisted_but_event_applies() {
        let user = linked_user("cus_123");
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        // Provider has no sub_123: the id belongs to another environment.
        let provider = Arc::new(MockBillingProvider::new());
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let outcome = handler
            .handle(subscription_event("evt_1", "active", "price_plus_monthly"))
            .await
            .unwrap();

        assert_eq!(outcome, ProcessOutcome::Applied);
        let stored = &repo.get_users()[0];
        assert!(stored.billing_subscription_id.is_none());
        assert_eq!(stored.plan, Plan::Plus);
        assert_eq!(stored.plan_status.as_deref(), Some("active"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription Deleted Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn deleted_subscription_resets_plan_and_unpublishes() {
        let mut user = linked_user("cus_123");
        user.plan = Plan::Plus;
        user.plan_status = Some("active".to_string());
        user.billing_subscription_id = Some("sub_123".to_string());
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider = Arc::new(MockBillingProvider::new());
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let event = StripeEventBuilder::new()
            .id("evt_del")
            .event_type("customer.subscription.deleted")
            .object(json!({
                "id": "sub_123",
                "customer": "cus_123",
                "status": "canceled"
            }))
            .build();

        let outcome = handler.handle(event).await.unwrap();

        assert_eq!(outcome, ProcessOutcome::Applied);
        let stored = &repo.get_users()[0];
        let stored_profile = &repo.get_profiles()[0];
        assert_eq!(stored.plan, Plan::Lite);
        assert_eq!(stored.plan_status.as_deref(), Some("canceled"));
        assert!(stored.billing_subscription_id.is_none());
        assert!(stored.subscription_lapsed_at.is_some());
        assert_eq!(stored_profile.visibility, Visibility::Unpublished);
        assert_eq!(
            stored_profile.unpublish_reason,
            UnpublishReason::SubscriptionLapsed
        );
        assert_retention_is_ninety_days(stored_profile);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Invoice Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_invoice_reactivates_lapsed_user() {
        let mut user = linked_user("cus_123");
        user.plan_status = Some("past_due".to_string());
        let lapse_at = Timestamp::now().minus_days(3);
        user.record_lapse(lapse_at);
        let mut profile = Profile::new(user.id);
        profile.unpublish_for_lapse(UnpublishReason::SubscriptionLapsed, lapse_at);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider =
            Arc::new(MockBillingProvider::new().with_subscription("sub_123", "cus_123", "active"));
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let event = StripeEventBuilder::new()
            .id("evt_paid")
            .event_type("invoice.payment_succeeded")
            .object(json!({
                "id": "in_123",
                "customer": "cus_123",
                "subscription": "sub_123",
                "lines": {"data": [{"price": {"id": "price_plus_monthly"}}]}
            }))
            .build();

        let outcome = handler.handle(event).await.unwrap();

        assert_eq!(outcome, ProcessOutcome::Applied);
        let stored = &repo.get_users()[0];
        let stored_profile = &repo.get_profiles()[0];
        assert_eq!(stored.plan, Plan::Plus);
        assert_eq!(stored.plan_status.as_deref(), Some("active"));
        assert!(stored.subscription_lapsed_at.is_none());
        assert!(stored.subscription_reactivated_at.is_some());
        assert_eq!(stored_profile.visibility, Visibility::Public);
        assert_eq!(stored_profile.unpublish_reason, UnpublishReason::None);
        assert!(stored_profile.retention_until.is_none());
    }

    #[tokio::test]
    async fn failed_invoice_only_mirrors_status() {
        let mut user = linked_user("cus_123");
        user.plan = Plan::Plus;
        user.plan_status = Some("active".to_string());
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider = Arc::new(MockBillingProvider::new());
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let event = StripeEventBuilder::new()
            .id("evt_failed")
            .event_type("invoice.payment_failed")
            .object(json!({
                "id": "in_123",
                "customer": "cus_123",
                "subscription": "sub_123"
            }))
            .build();

        let outcome = handler.handle(event).await.unwrap();

        assert_eq!(outcome, ProcessOutcome::Applied);
        let stored = &repo.get_users()[0];
        let stored_profile = &repo.get_profiles()[0];
        assert_eq!(stored.plan_status.as_deref(), Some("past_due"));
        // Nothing else moves: plan, lapse stamps, and profile are untouched.
        assert_eq!(stored.plan, Plan::Plus);
        assert!(stored.subscription_lapsed_at.is_none());
        assert_eq!(stored_profile.visibility, Visibility::Public);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn checkout_applies_metadata_plan_and_activates() {
        let user = linked_user("cus_123");
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider =
            Arc::new(MockBillingProvider::new().with_subscription("sub_456", "cus_123", "active"));
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let event = StripeEventBuilder::new()
            .id("evt_checkout")
            .event_type("checkout.session.completed")
            .object(json!({
                "id": "cs_123",
                "customer": "cus_123",
                "subscription": "sub_456",
                "metadata": {"price_id": "price_pro_monthly"}
            }))
            .build();

        let outcome = handler.handle(event).await.unwrap();

        assert_eq!(outcome, ProcessOutcome::Applied);
        let stored = &repo.get_users()[0];
        assert_eq!(stored.plan, Plan::Pro);
        assert_eq!(stored.plan_status.as_deref(), Some("active"));
        assert_eq!(stored.billing_subscription_id.as_deref(), Some("sub_456"));
    }

    #[tokio::test]
    async fn checkout_with_unmapped_price_is_acknowledged_without_changes() {
        let user = linked_user("cus_123");
        let original_plan = user.plan;
        let repo = Arc::new(MockEntitlementRepository::with_user(user));
        let provider = Arc::new(MockBillingProvider::new());
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let event = StripeEventBuilder::new()
            .id("evt_checkout")
            .event_type("checkout.session.completed")
            .object(json!({
                "id": "cs_123",
                "customer": "cus_123",
                "subscription": null,
                "metadata": {"price_id": "price_unknown"}
            }))
            .build();

        let outcome = handler.handle(event).await.unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Acknowledged(SkipReason::UnmappedPrice("price_unknown".to_string()))
        );
        assert_eq!(repo.get_users()[0].plan, original_plan);
        let records = ledger.get_records();
        assert_eq!(records[0].result, "ignored");
    }

    #[tokio::test]
    async fn checkout_without_customer_is_acknowledged() {
        let repo = Arc::new(MockEntitlementRepository::new());
        let provider = Arc::new(MockBillingProvider::new());
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let event = StripeEventBuilder::new()
            .id("evt_checkout")
            .event_type("checkout.session.completed")
            .object(json!({
                "id": "cs_123",
                "customer": null,
                "subscription": null
            }))
            .build();

        let outcome = handler.handle(event).await.unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Acknowledged(SkipReason::MissingCustomer)
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotency Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_event_id_skips_handlers() {
        let mut user = linked_user("cus_123");
        user.plan = Plan::Lite;
        let repo = Arc::new(MockEntitlementRepository::with_user(user));
        let provider =
            Arc::new(MockBillingProvider::new().with_subscription("sub_123", "cus_123", "active"));
        let ledger = Arc::new(MockWebhookEventRepository::with_record(
            WebhookEventRecord::processed(
                "evt_dup",
                "customer.subscription.updated",
                json!({}),
            ),
        ));
        let handler = handler(&repo, &provider, &ledger);

        let outcome = handler
            .handle(subscription_event("evt_dup", "active", "price_plus_monthly"))
            .await
            .unwrap();

        assert_eq!(outcome, ProcessOutcome::AlreadyProcessed);
        // Handlers never ran: the user is exactly as before.
        assert_eq!(repo.get_users()[0].plan, Plan::Lite);
        assert!(repo.get_users()[0].plan_status.is_none());
    }

    #[tokio::test]
    async fn concurrent_insert_race_reports_already_processed() {
        let user = linked_user("cus_123");
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider =
            Arc::new(MockBillingProvider::new().with_subscription("sub_123", "cus_123", "active"));
        let ledger = Arc::new(MockWebhookEventRepository::new());
        ledger.conflict_on_save();
        let handler = handler(&repo, &provider, &ledger);

        let outcome = handler
            .handle(subscription_event("evt_race", "active", "price_plus_monthly"))
            .await
            .unwrap();

        assert_eq!(outcome, ProcessOutcome::AlreadyProcessed);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Skip and Error Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged_and_recorded() {
        let repo = Arc::new(MockEntitlementRepository::new());
        let provider = Arc::new(MockBillingProvider::new());
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let event = StripeEventBuilder::new()
            .id("evt_other")
            .event_type("customer.created")
            .object(json!({"id": "cus_999"}))
            .build();

        let outcome = handler.handle(event).await.unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Acknowledged(SkipReason::UnknownEventType(
                "customer.created".to_string()
            ))
        );
        let records = ledger.get_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, "ignored");
        assert_eq!(
            records[0].error_message.as_deref(),
            Some("unhandled event type customer.created")
        );
    }

    #[tokio::test]
    async fn unresolvable_customer_is_acknowledged_and_recorded() {
        let repo = Arc::new(MockEntitlementRepository::new());
        let provider = Arc::new(MockBillingProvider::new());
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let outcome = handler
            .handle(subscription_event("evt_1", "active", "price_plus_monthly"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Acknowledged(SkipReason::CustomerNotFound("cus_123".to_string()))
        );
        let records = ledger.get_records();
        assert_eq!(records[0].result, "ignored");
    }

    #[tokio::test]
    async fn provider_outage_fails_retryably_without_ledger_entry() {
        let repo = Arc::new(MockEntitlementRepository::new());
        let provider = Arc::new(MockBillingProvider::failing(
            crate::ports::ProviderError::timeout("deadline exceeded"),
        ));
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let result = handler
            .handle(subscription_event("evt_1", "active", "price_plus_monthly"))
            .await;

        let err = result.unwrap_err();
        assert!(err.is_retryable());
        // No record: the retry will run the handlers again.
        assert!(ledger.get_records().is_empty());
    }

    #[tokio::test]
    async fn database_failure_fails_retryably_without_ledger_entry() {
        let user = linked_user("cus_123");
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        repo.fail_writes();
        let provider =
            Arc::new(MockBillingProvider::new().with_subscription("sub_123", "cus_123", "active"));
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let result = handler
            .handle(subscription_event("evt_1", "active", "price_plus_monthly"))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, WebhookError::Database(_)));
        assert!(err.is_retryable());
        assert!(ledger.get_records().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_for_handled_type_is_an_error() {
        let repo = Arc::new(MockEntitlementRepository::new());
        let provider = Arc::new(MockBillingProvider::new());
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let event = StripeEventBuilder::new()
            .id("evt_bad")
            .event_type("customer.subscription.updated")
            .object(json!({"id": "sub_123"}))
            .build();

        let result = handler.handle(event).await;

        assert!(matches!(
            result,
            Err(WebhookError::MalformedEvent { .. })
        ));
        assert!(ledger.get_records().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Email Fallback Integration Test
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn event_for_unattached_customer_resolves_via_email() {
        let user = User::new("alex@example.com");
        let profile = Profile::new(user.id);
        let repo = Arc::new(MockEntitlementRepository::with_user_and_profile(
            user, profile,
        ));
        let provider = Arc::new(
            MockBillingProvider::new()
                .with_customer("cus_123", Some("alex@example.com"))
                .with_subscription("sub_123", "cus_123", "active"),
        );
        let ledger = Arc::new(MockWebhookEventRepository::new());
        let handler = handler(&repo, &provider, &ledger);

        let outcome = handler
            .handle(subscription_event("evt_1", "active", "price_plus_monthly"))
            .await
            .unwrap();

        assert_eq!(outcome, ProcessOutcome::Applied);
        let stored = &repo.get_users()[0];
        assert_eq!(stored.billing_customer_id.as_deref(), Some("cus_123"));
        assert_eq!(stored.plan, Plan::Plus);
        assert_eq!(repo.attach_calls().len(), 1);
    }
}
