//! Image catalog collaborator.
//!
//! The registry is one JSON document in the object store mapping `image_key` to
//! [`ImageRecord`]. It is read on every call; nothing is cached between turns.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::{CandidateImage, ImageRecord};
use crate::core::errors::ApiError;
use crate::storage::ObjectStore;

pub const REGISTRY_KEY: &str = "metadata/image_registry.json";

#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Images for a location in catalog order. Empty, not an error, when there are none.
    async fn get_images(&self, area: &str, site: &str) -> Result<Vec<CandidateImage>, ApiError>;
}

#[derive(Clone)]
pub struct RegistryImageCatalog {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl RegistryImageCatalog {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            key: REGISTRY_KEY.to_string(),
        }
    }

    async fn load_records(&self) -> Result<Vec<ImageRecord>, ApiError> {
        let Some(document) = self.store.get_json(&self.key).await? else {
            return Ok(Vec::new());
        };
        let Value::Object(entries) = document else {
            return Err(ApiError::Internal(format!(
                "image registry at '{}' is not an object",
                self.key
            )));
        };

        let mut records = Vec::with_capacity(entries.len());
        for (image_key, entry) in entries {
            match serde_json::from_value::<ImageRecord>(entry) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!("Skipping malformed image record {}: {}", image_key, err);
                }
            }
        }
        Ok(records)
    }

    pub async fn records_for_location(
        &self,
        area: &str,
        site: &str,
    ) -> Result<Vec<ImageRecord>, ApiError> {
        let mut records: Vec<ImageRecord> = self
            .load_records()
            .await?
            .into_iter()
            .filter(|record| record.area == area && record.site == site)
            .collect();
        records.sort_by(|a, b| {
            a.image_index
                .cmp(&b.image_index)
                .then_with(|| a.image_key.cmp(&b.image_key))
        });
        Ok(records)
    }

    /// Adds or replaces a record in the registry.
    pub async fn register(&self, record: ImageRecord) -> Result<(), ApiError> {
        let mut entries = match self.store.get_json(&self.key).await? {
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                return Err(ApiError::Internal(format!(
                    "image registry at '{}' is not an object",
                    self.key
                )))
            }
            None => Map::new(),
        };
        let value = serde_json::to_value(&record).map_err(ApiError::internal)?;
        entries.insert(record.image_key.clone(), value);
        self.store.put_json(&self.key, &Value::Object(entries)).await
    }
}

#[async_trait]
impl ImageCatalog for RegistryImageCatalog {
    async fn get_images(&self, area: &str, site: &str) -> Result<Vec<CandidateImage>, ApiError> {
        let images: Vec<CandidateImage> = self
            .records_for_location(area, site)
            .await?
            .iter()
            .filter(|record| !record.file_api_uri.trim().is_empty())
            .map(ImageRecord::to_candidate)
            .collect();
        tracing::debug!("Found {} images for {}/{}", images.len(), area, site);
        Ok(images)
    }
}
