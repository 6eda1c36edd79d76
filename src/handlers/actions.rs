use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{ActionResponse, UptimeResponse};
use crate::AppState;

use super::ApiError;

#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    pub max_lines: Option<usize>,
}

/// Ping a device
pub async fn ping_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    Ok(Json(state.actions.ping(&device_id).await?))
}

/// Back up a device configuration
pub async fn backup_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    Ok(Json(state.actions.backup(&device_id).await?))
}

/// Compare the two latest backups of a device
pub async fn diff_backups(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<ActionResponse>, ApiError> {
    let max_lines = query.max_lines.unwrap_or(state.config.diff_max_lines);
    Ok(Json(state.actions.diff(&device_id, max_lines).await?))
}

/// Restart a device
pub async fn restart_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    Ok(Json(state.actions.restart(&device_id).await?))
}

/// Report device uptime
pub async fn device_uptime(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<UptimeResponse>, ApiError> {
    Ok(Json(state.actions.uptime(&device_id).await?))
}
