//! EcoBin Collection Server
//!
//! Main entry point for the collection server.

use ecobin_server::{
    bin_registry::{BinRegistryService, BinRepository},
    collection::{CollectionRepository, CollectionService},
    identity_resolver::IdentityResolver,
    state::{AppConfig, AppState},
    web_api,
};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecobin_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EcoBin Collection Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_url = %config.database_url,
        collect_base_url = %config.collect_base_url,
        collection_interval_days = config.collection_interval_days,
        "Configuration loaded"
    );

    // Create database pool
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connected");

    // Initialize components
    let bin_store = Arc::new(BinRepository::new(pool.clone()));
    let collection_store = Arc::new(CollectionRepository::new(pool.clone()));

    let bin_registry = Arc::new(BinRegistryService::new(
        bin_store.clone(),
        config.collect_base_url.clone(),
    ));
    tracing::info!("BinRegistryService initialized");

    let resolver = Arc::new(IdentityResolver::new(bin_store.clone()));
    tracing::info!("IdentityResolver initialized");

    let collection = Arc::new(CollectionService::new(
        bin_store,
        collection_store,
        config.collection_interval_days,
    ));
    tracing::info!(
        interval_days = config.collection_interval_days,
        "CollectionService initialized"
    );

    // Create application state
    let state = AppState {
        pool,
        config: config.clone(),
        bin_registry,
        resolver,
        collection,
        started_at: Instant::now(),
    };

    // Create router
    let app = web_api::create_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "EcoBin Collection Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
