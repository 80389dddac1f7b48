use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Registered locations with the distinct areas they cover.
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let locations = state.locations.list().await?;
    let areas: BTreeSet<&str> = locations.iter().map(|l| l.area.as_str()).collect();
    Ok(Json(json!({
        "locations": locations,
        "count": locations.len(),
        "areas": areas
    })))
}

pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Path((area, site)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let images = state.catalog.get_images(&area, &site).await?;
    let result: Vec<Value> = images
        .into_iter()
        .map(|image| {
            json!({
                "id": image.id,
                "caption": image.caption,
                "context": image.context()
            })
        })
        .collect();
    Ok(Json(json!({
        "area": area,
        "site": site,
        "images": result
    })))
}
