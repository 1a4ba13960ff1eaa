//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum webhook endpoint and health probe
//! - `postgres` - sqlx repositories and connection pool
//! - `stripe` - Read-only billing provider client

pub mod http;
pub mod postgres;
pub mod stripe;

pub use postgres::{
    create_pool, PostgresEntitlementRepository, PostgresWebhookEventRepository,
};
pub use stripe::{StripeApiConfig, StripeGateway};
