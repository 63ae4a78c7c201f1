//! Car rental server
//!
//! Serves the vehicle catalog, bookings and the admin dashboard over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use car_rental_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{
        policy::{AccessPolicy, EmailAllowList},
        storage::LocalImageStore,
        Services, SystemClock,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("car_rental_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting car rental server v{}", env!("CARGO_PKG_VERSION"));

    if config.admin.emails.is_empty() {
        tracing::warn!("No admin emails configured; admin endpoints will refuse every caller");
    }

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Wire services
    let repository = Repository::postgres(pool);
    let admins = Arc::new(EmailAllowList::new(&config.admin.emails));
    let policy = Arc::new(AccessPolicy::new(admins));
    let images = Arc::new(LocalImageStore::new(
        &config.storage.upload_dir,
        &config.storage.public_url,
    ));
    tokio::fs::create_dir_all(images.dir())
        .await
        .context("Failed to create upload directory")?;

    let services = Services::new(
        repository,
        policy,
        images,
        Arc::new(SystemClock),
        config.dashboard.clone(),
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
