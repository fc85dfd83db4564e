//! shopmap-sd library - Storefront Directory service
//!
//! Serves the public storefront listing and the clustered map-pin layer.
//! The geocode/projection/clustering pipeline lives under [`geo`]; the HTTP
//! surface is plain request-handling glue around it.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::geo::geocode::GeocodeResolver;

pub mod api;
pub mod db;
pub mod geo;
pub mod pagination;
pub mod query;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (record store)
    pub db: SqlitePool,
    /// Geocode resolver with its process-lifetime cache
    pub resolver: Arc<GeocodeResolver>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, resolver: Arc<GeocodeResolver>) -> Self {
        Self { db, resolver }
    }
}

/// Build application router
///
/// The directory is public: no authentication, permissive CORS so the
/// rendering layer can be served from anywhere.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/api/stores", get(api::stores::list_stores))
        .route("/api/stores/pins", get(api::stores::map_pins))
        .merge(api::health::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
