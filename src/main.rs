//! AEOBRO service binary.
//!
//! Wires configuration, the database pool, the Stripe client, and the
//! webhook router together and serves the app.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use secrecy::ExposeSecret;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aeobro::adapters::http::{health_routes, webhook_routes, BillingAppState};
use aeobro::adapters::{
    create_pool, PostgresEntitlementRepository, PostgresWebhookEventRepository, StripeApiConfig,
    StripeGateway,
};
use aeobro::application::ProcessStripeEventHandler;
use aeobro::config::AppConfig;
use aeobro::domain::billing::WebhookVerifier;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    config.validate()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "starting aeobro entitlement service"
    );

    let pool = create_pool(&config.database).await?;
    if config.database.run_migrations {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let repository = Arc::new(PostgresEntitlementRepository::new(pool.clone()));
    let webhook_events = Arc::new(PostgresWebhookEventRepository::new(pool));

    let provider = Arc::new(StripeGateway::new(StripeApiConfig::new(
        config.billing.stripe_api_key.expose_secret().clone(),
        config.billing.provider_timeout(),
    )));

    let price_book = Arc::new(config.billing.price_book());
    info!(prices = price_book.len(), "price book loaded");

    let processor = Arc::new(ProcessStripeEventHandler::new(
        repository,
        provider,
        webhook_events,
        price_book,
    ));
    let verifier = Arc::new(WebhookVerifier::new(
        config.billing.stripe_webhook_secret.expose_secret().clone(),
    ));

    let state = BillingAppState {
        verifier,
        processor,
    };

    let app = axum::Router::new()
        .nest("/api/webhooks", webhook_routes())
        .merge(health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr();
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
