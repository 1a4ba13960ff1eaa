//! Application layer.
//!
//! Use-case orchestration built on the domain model and ports. Handlers
//! receive verified input from adapters, coordinate domain operations,
//! and persist outcomes through the repository ports.

pub mod handlers;

pub use handlers::{
    CustomerResolver, LifecycleEffects, ProcessOutcome, ProcessStripeEventHandler,
    ResolutionError, SkipReason, SubscriptionGuard,
};
