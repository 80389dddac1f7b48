use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

fn default_older_than_hours() -> i64 {
    3
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteParams {
    #[serde(default = "default_older_than_hours")]
    pub older_than_hours: i64,
    /// Only conversations whose id starts with this are considered.
    #[serde(default)]
    pub prefix: String,
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state
        .conversations
        .get(&conversation_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Conversation not found: {}", conversation_id))
        })?;
    Ok(Json(conversation))
}

pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.conversations.delete(&conversation_id).await? {
        return Err(ApiError::NotFound(format!(
            "Conversation not found: {}",
            conversation_id
        )));
    }
    Ok(Json(json!({
        "status": "deleted",
        "conversation_id": conversation_id
    })))
}

/// Deletes conversations with no message newer than `older_than_hours`.
pub async fn delete_conversations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BulkDeleteParams>,
) -> Result<impl IntoResponse, ApiError> {
    let cutoff = (params.older_than_hours >= 1)
        .then(|| Duration::try_hours(params.older_than_hours))
        .flatten()
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "older_than_hours must be a positive number of hours, got {}",
                params.older_than_hours
            ))
        })?;

    let count = state
        .conversations
        .delete_inactive_since(cutoff, params.prefix.trim())
        .await?;

    let prefix = match params.prefix.trim() {
        "" => "all",
        prefix => prefix,
    };
    Ok(Json(json!({
        "status": "deleted",
        "count": count,
        "older_than_hours": params.older_than_hours,
        "prefix": prefix
    })))
}
