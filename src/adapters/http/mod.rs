//! HTTP adapters - REST API implementations.
//!
//! The webhook endpoint is the service's write path; the health probe
//! is the only other surface.

pub mod billing;
pub mod health;

// Re-export key types for convenience
pub use billing::webhook_routes;
pub use billing::BillingAppState;
pub use health::health_routes;
