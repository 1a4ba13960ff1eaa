//! Ports layer - interfaces between the application core and the outside world.
//!
//! Ports are traits the application depends on; adapters provide the
//! concrete implementations. This keeps domain and application logic free
//! of infrastructure concerns.
//!
//! # Modules
//!
//! - `billing_provider` - Read-only payment provider lookups
//! - `entitlement_repository` - User and profile persistence
//! - `webhook_event_repository` - Processed webhook ledger

mod billing_provider;
mod entitlement_repository;
mod webhook_event_repository;

pub use billing_provider::{
    BillingProvider, ProviderCustomer, ProviderError, ProviderErrorCode, ProviderSubscription,
};
pub use entitlement_repository::EntitlementRepository;
pub use webhook_event_repository::{SaveResult, WebhookEventRecord, WebhookEventRepository};
