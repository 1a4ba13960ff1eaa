//! Billing reconciliation handlers.
//!
//! Orchestrates webhook event processing from verified envelope to
//! persisted entitlement state:
//!
//! - `ProcessStripeEventHandler` - dispatches events to their effects
//! - `CustomerResolver` - ties billing customer ids to local accounts
//! - `SubscriptionGuard` - filters foreign-environment subscription ids
//! - `LifecycleEffects` - applies lapse and reactivation atomically

mod customer_resolver;
mod lifecycle_effects;
mod process_stripe_event;
mod subscription_guard;

#[cfg(test)]
pub(crate) mod test_support;

pub use customer_resolver::{CustomerResolver, ResolutionError};
pub use lifecycle_effects::LifecycleEffects;
pub use process_stripe_event::{ProcessOutcome, ProcessStripeEventHandler, SkipReason};
pub use subscription_guard::SubscriptionGuard;
