use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::models::{Footprint, FootprintPatch, NewFootprint};
use crate::AppState;

/// Create a new footprint entry
///
/// The store assigns the derived fields: a fresh id, the creation
/// timestamp and the reward points for the submitted emissions.
/// Caller-supplied values for any of them are dropped by typed
/// deserialization of the request body.
pub async fn create_footprint(
    State(state): State<AppState>,
    Json(payload): Json<NewFootprint>,
) -> Result<Json<Footprint>> {
    let store = state.store.clone();
    let footprint = tokio::task::spawn_blocking(move || store.create(payload)).await??;

    tracing::info!(
        "Footprint created: {} ({} kg CO2, {} points)",
        footprint.id,
        footprint.carbon_emissions,
        footprint.reward_points
    );

    Ok(Json(footprint))
}

/// List all footprint entries (no ordering guarantee, no pagination)
pub async fn list_footprints(State(state): State<AppState>) -> Result<Json<Vec<Footprint>>> {
    let store = state.store.clone();
    let footprints = tokio::task::spawn_blocking(move || store.get_all()).await??;

    Ok(Json(footprints))
}

/// Fetch a single footprint by id
pub async fn get_footprint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Footprint>> {
    let store = state.store.clone();
    let footprint = tokio::task::spawn_blocking(move || store.get(&id)).await??;

    Ok(Json(footprint))
}

/// Merge a partial update over an existing footprint
///
/// Omitted fields keep their stored value; reward points are always
/// recomputed from the merged emissions value.
pub async fn update_footprint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<FootprintPatch>,
) -> Result<Json<Footprint>> {
    let store = state.store.clone();
    let footprint = tokio::task::spawn_blocking(move || store.update(&id, patch)).await??;

    tracing::info!(
        "Footprint updated: {} ({} kg CO2, {} points)",
        footprint.id,
        footprint.carbon_emissions,
        footprint.reward_points
    );

    Ok(Json(footprint))
}

/// Delete a footprint permanently, returning its prior state
pub async fn delete_footprint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Footprint>> {
    let store = state.store.clone();
    let footprint = tokio::task::spawn_blocking(move || store.remove(&id)).await??;

    tracing::info!("Footprint deleted: {}", footprint.id);

    Ok(Json(footprint))
}
