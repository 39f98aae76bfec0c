use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use staylink_api::{app, AppState};
use staylink_catalog::SupplierRegistry;
use staylink_core::payment::LoggingRefundGateway;
use staylink_store::{DbClient, PostgresBookingRepository, PostgresInventoryRepository, SharedCache};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "staylink_api=debug,staylink_catalog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = staylink_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting StayLink API on port {}", config.server.port);

    // Postgres connects lazily so search keeps working on remote suppliers while it is down
    let db = DbClient::lazy(&config.database).context("Invalid database configuration")?;
    if let Err(e) = db.migrate().await {
        tracing::error!("Database migrations failed: {}", e);
    }

    let cache = SharedCache::from_config(&config.cache).await;

    let inventory = Arc::new(PostgresInventoryRepository::new(db.pool.clone()));
    let registry = SupplierRegistry::from_config(&config.suppliers, inventory, cache)
        .context("Failed to build supplier registry")?;

    let app_state = AppState::new(
        Arc::new(registry),
        Arc::new(PostgresBookingRepository::new(db.pool.clone())),
        Arc::new(LoggingRefundGateway),
        &config.business_rules,
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.context("Failed to bind listener")?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
