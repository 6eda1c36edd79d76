use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::DeviceListResponse;
use crate::AppState;

/// List inventory devices, sorted and grouped for the console
pub async fn list_devices(State(state): State<Arc<AppState>>) -> Json<DeviceListResponse> {
    let registry = state.registry.read().await.clone();
    Json(registry.grouped())
}
