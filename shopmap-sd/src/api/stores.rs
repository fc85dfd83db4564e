//! Store listing and map pin endpoints
//!
//! Both endpoints load the full record set and run the sequential geocode
//! batch first, so every listing render tops up the persisted coordinates.
//! A record that cannot be geocoded stays in the textual listing and is
//! only missing from the map layer.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::db::stores::load_all_stores;
use crate::geo::cluster::{cluster, PinPoint, DEFAULT_CLUSTER_THRESHOLD};
use crate::geo::project::project;
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::query::{self, SortKey, StoreFilter};
use crate::AppState;
use shopmap_common::db::models::StoreRecord;

/// Query parameters for the store listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// Store listing response
#[derive(Debug, Serialize)]
pub struct StoresResponse {
    pub stores: Vec<StoreRecord>,
    pub total_results: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// GET /api/stores
///
/// The filtered, sorted, paginated store listing, coordinates attached
/// where resolution succeeded.
pub async fn list_stores(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<StoresResponse>, ApiError> {
    let mut stores = load_all_stores(&state.db)
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    state.resolver.resolve_batch(&state.db, &mut stores).await;

    let filter = StoreFilter {
        search: params.search,
        region: params.region,
        country: params.country,
        sort: params.sort,
    };
    let filtered = query::apply(stores, &filter);

    let total_results = filtered.len() as i64;
    let p = calculate_pagination(total_results, params.page);
    let page_items: Vec<StoreRecord> = filtered
        .into_iter()
        .skip(p.offset as usize)
        .take(PAGE_SIZE as usize)
        .collect();

    Ok(Json(StoresResponse {
        stores: page_items,
        total_results,
        page: p.page,
        page_size: PAGE_SIZE,
        total_pages: p.total_pages,
    }))
}

/// Query parameters for the map pin layer
#[derive(Debug, Deserialize)]
pub struct PinsQuery {
    pub threshold: Option<f64>,
}

/// One rendered map marker: a cluster of nearby stores
#[derive(Debug, Serialize)]
pub struct MapPin {
    pub x: f64,
    pub y: f64,
    pub count: usize,
    pub store_ids: Vec<Uuid>,
}

/// Map pin layer response
#[derive(Debug, Serialize)]
pub struct PinsResponse {
    pub pins: Vec<MapPin>,
}

/// GET /api/stores/pins
///
/// The clustered map layer. Only records with resolved coordinates
/// contribute pins; pin order is cluster creation order.
pub async fn map_pins(
    State(state): State<AppState>,
    Query(params): Query<PinsQuery>,
) -> Result<Json<PinsResponse>, ApiError> {
    let threshold = params.threshold.unwrap_or(DEFAULT_CLUSTER_THRESHOLD);
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ApiError::BadRequest(
            "threshold must be a positive number".to_string(),
        ));
    }

    let mut stores = load_all_stores(&state.db)
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    state.resolver.resolve_batch(&state.db, &mut stores).await;

    let points: Vec<PinPoint> = stores
        .iter()
        .filter(|store| store.has_coordinates())
        .filter_map(|store| {
            let (lat, lon) = (store.latitude?, store.longitude?);
            let p = project(lat, lon);
            Some(PinPoint {
                store_id: store.guid,
                x: p.x,
                y: p.y,
            })
        })
        .collect();

    let pins = cluster(points, threshold)
        .into_iter()
        .map(|c| MapPin {
            x: c.x,
            y: c.y,
            count: c.count(),
            store_ids: c.members.iter().map(|m| m.store_id).collect(),
        })
        .collect();

    Ok(Json(PinsResponse { pins }))
}

/// API errors, rendered as a flat `{"error": message}` body
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request parameter (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Record store failure (500)
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
