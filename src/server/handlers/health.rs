use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let images = &state.settings.images;
    Ok(Json(json!({
        "initialized": true,
        "started_at": state.started_at_utc.to_rfc3339(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "provider": state.orchestrator.provider_name(),
        "model": state.settings.completion.model,
        "relevance_threshold": images.relevance_threshold,
        "max_images_per_turn": images.max_images_per_turn,
        "history_window": state.settings.history.window
    })))
}
