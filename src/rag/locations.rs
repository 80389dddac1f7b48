//! Registry of the locations that have a document corpus.
//!
//! Stored at [`LOCATION_REGISTRY_KEY`] as an object keyed `"{area}:{site}"`, each entry naming
//! the store key of the location's passages. A `_global` entry may hold registry-wide metadata
//! and is not a location.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::retriever::passage_key;
use crate::core::errors::ApiError;
use crate::storage::ObjectStore;

pub const LOCATION_REGISTRY_KEY: &str = "metadata/store_registry.json";

const GLOBAL_ENTRY: &str = "_global";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub area: String,
    pub site: String,
    pub store_name: String,
}

pub struct LocationRegistry {
    store: Arc<dyn ObjectStore>,
}

fn make_key(area: &str, site: &str) -> String {
    format!("{}:{}", area, site)
}

fn entry_location(key: &str, entry: &Value) -> Option<Location> {
    if key == GLOBAL_ENTRY {
        return None;
    }
    let (area, site) = key.split_once(':')?;
    let store_name = entry
        .get("store_name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())?;
    Some(Location {
        area: area.to_string(),
        site: site.to_string(),
        store_name: store_name.to_string(),
    })
}

impl LocationRegistry {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    async fn load(&self) -> Result<Map<String, Value>, ApiError> {
        match self.store.get_json(LOCATION_REGISTRY_KEY).await? {
            None => Ok(Map::new()),
            Some(Value::Object(entries)) => Ok(entries),
            Some(_) => Err(ApiError::Internal(format!(
                "location registry at '{}' must be an object",
                LOCATION_REGISTRY_KEY
            ))),
        }
    }

    /// All registered locations, sorted by area then site.
    pub async fn list(&self) -> Result<Vec<Location>, ApiError> {
        let entries = self.load().await?;
        let mut locations: Vec<Location> = entries
            .iter()
            .filter_map(|(key, entry)| {
                let location = entry_location(key, entry);
                if location.is_none() && key != GLOBAL_ENTRY {
                    tracing::warn!("Skipping malformed location registry entry '{}'", key);
                }
                location
            })
            .collect();
        locations.sort_by(|a, b| (&a.area, &a.site).cmp(&(&b.area, &b.site)));
        Ok(locations)
    }

    pub async fn get(&self, area: &str, site: &str) -> Result<Option<Location>, ApiError> {
        let key = make_key(area, site);
        let entries = self.load().await?;
        Ok(entries
            .get(&key)
            .and_then(|entry| entry_location(&key, entry)))
    }

    /// Registers a location whose passages live at [`passage_key`]. Other fields already on the
    /// entry are kept.
    pub async fn register(&self, area: &str, site: &str) -> Result<Location, ApiError> {
        let key = make_key(area, site);
        let mut entries = self.load().await?;

        let mut entry = match entries.remove(&key) {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        let store_name = passage_key(area, site);
        entry.insert("store_name".to_string(), Value::String(store_name.clone()));
        entry
            .entry("created_at".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        entries.insert(key, Value::Object(entry));

        self.store
            .put_json(LOCATION_REGISTRY_KEY, &Value::Object(entries))
            .await?;
        tracing::info!("Registered location {}/{}", area, site);

        Ok(Location {
            area: area.to_string(),
            site: site.to_string(),
            store_name,
        })
    }
}
