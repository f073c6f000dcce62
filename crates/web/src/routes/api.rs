//! JSON API route handlers.
//!
//! ```text
//! GET  /api/v1/search?q=              - Up to 5 stores, most relevant first
//! GET  /api/v1/stores/near?lng=&lat=  - Up to 10 stores within 10 km
//! POST /api/v1/stores/{id}/heart      - Toggle a heart, returns the user
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use delicious_core::StoreId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{NearbyStore, Store, User};
use crate::services::stores::StoreService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lng: Option<String>,
    pub lat: Option<String>,
}

/// Text search over store names and descriptions.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Store>>> {
    let stores = StoreService::new(state.repos()).search(&query.q).await?;
    Ok(Json(stores))
}

/// Stores near a point. Bad coordinates are a 400.
#[instrument(skip(state))]
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<NearbyStore>>> {
    let stores = StoreService::new(state.repos())
        .near(query.lng.as_deref(), query.lat.as_deref())
        .await?;
    Ok(Json(stores))
}

/// Toggle a heart for the logged-in user.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn heart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
) -> Result<Json<User>> {
    let user = StoreService::new(state.repos())
        .toggle_heart(user.id, id)
        .await?;
    Ok(Json(user))
}
