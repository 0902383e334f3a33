//! Axum Router Configuration
//!
//! The gateway exposes exactly two endpoints: the WebSocket upgrade and a
//! liveness probe. Everything else lives behind the WebSocket protocol.

use crate::{state::AppState, ws::ws_handler};
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
