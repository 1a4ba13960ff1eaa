//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    // Handler
    ProcessStripeEventHandler,
    // Outcomes
    ProcessOutcome,
    SkipReason,
    // Collaborators
    CustomerResolver,
    LifecycleEffects,
    ResolutionError,
    SubscriptionGuard,
};
