pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod tracker;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::seed::seed_catalog;
use crate::db::{StoreError, Stores};
use crate::state::AppState;

/// Opens the configured stores and seeds the catalog when enabled.
pub async fn build_state(config: &Config) -> Result<AppState, StoreError> {
    let stores = Stores::open(&config.database).await?;
    if config.seed_catalog {
        seed_catalog(stores.catalog.as_ref()).await?;
    }
    Ok(AppState::new(stores, config.tracker.clone()))
}

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
