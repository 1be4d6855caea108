pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export logic types
pub use logic::{
    EditError, FieldError, ListingPage, ListingParams, ListingQuery, ResourceEditor, PAGE_SIZE,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

use crate::api::handlers::AppState;
use crate::config::{AppConfig, Backend};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Build the store named by the configuration and serve until shutdown.
pub async fn run_server() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("sqlx", log::LevelFilter::Warn)
        .try_init();

    let config = AppConfig::load()?;

    match config.database.backend {
        Backend::Postgres => {
            let database_url = config.database_url()?;
            let store = PostgresStore::new(&database_url, config.max_connections()).await?;
            store.migrate().await?;
            serve(Arc::new(store), &config).await
        }
        Backend::Memory => {
            log::warn!("Using the in-memory store; data is lost on shutdown");
            serve(Arc::new(MemoryStore::new()), &config).await
        }
    }
}

/// Optionally seed, then serve the application on the configured address.
pub async fn serve<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
    }

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Tourist agency server running on http://{}", bind_address);

    serve_on(listener, store, config).await
}

/// Serve on an already bound listener.
pub async fn serve_on<S: Store + 'static>(
    listener: TcpListener,
    store: Arc<S>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let state = AppState::new(store, config.formatting.clone());
    let app = routes::create_router::<S>(&config.server.static_dir).with_state(state);

    axum::serve(listener, app).await?;

    Ok(())
}
