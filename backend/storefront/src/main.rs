//! STEM camp storefront entry point.
//!
//! Serves the registration wizard, the kit shop checkout and the admin
//! dashboard queries over an Axum REST API. Registrations and orders are
//! persisted through a [`store::RecordStore`], backed by SQLite or by an
//! in-process store when `DATABASE_URL=memory`.

mod admin;
mod api;
mod cart;
mod catalog;
mod checkout;
mod config;
mod db;
mod errors;
mod registration;
mod store;
mod wizard;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use store::{MemoryStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let store: Arc<dyn RecordStore> = if config.database_url == "memory" {
        warn!("Using the in-process record store; data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let pool = db::init_pool(&config.database_url).await?;
        Arc::new(db::SqliteStore::new(pool))
    };

    if config.admin_token.is_none() {
        info!("ADMIN_TOKEN not set; admin routes are disabled");
    }

    let addr = format!("0.0.0.0:{}", config.api_port);
    let api_state = Arc::new(api::ApiState { store, config });

    let app = api::router(api_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
