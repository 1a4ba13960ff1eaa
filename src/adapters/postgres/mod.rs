//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresEntitlementRepository` - User and Profile aggregate storage
//! - `PostgresWebhookEventRepository` - processed webhook event ledger

mod entitlement_repository;
mod webhook_event_repository;

pub use entitlement_repository::PostgresEntitlementRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;

/// Create a PostgreSQL connection pool from configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await?;

    tracing::info!("PostgreSQL connection pool ready");

    Ok(pool)
}
