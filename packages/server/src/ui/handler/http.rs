//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use tokio::sync::oneshot;

use crate::ui::state::{AppState, BrokerCommand, RoomSummaryDto};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms
pub async fn get_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomSummaryDto>>, StatusCode> {
    let (reply, rx) = oneshot::channel();
    state
        .commands
        .send(BrokerCommand::Snapshot { reply })
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    let summaries = rx.await.map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(summaries))
}
