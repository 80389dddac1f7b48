//! Key/value object storage for JSON documents.
//!
//! Durable state (image and location registries, passage corpora, conversations) is addressed by slash-separated keys such
//! as `metadata/image_registry.json`. `LocalObjectStore` maps keys onto a directory tree.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::ApiError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch and decode the JSON document at `key`; `None` when the key does not exist.
    async fn get_json(&self, key: &str) -> Result<Option<Value>, ApiError>;

    /// Store `value` at `key`, replacing any previous document.
    async fn put_json(&self, key: &str, value: &Value) -> Result<(), ApiError>;

    /// Remove the document at `key`; `false` when there was none.
    async fn delete(&self, key: &str) -> Result<bool, ApiError>;

    /// Sorted keys of the documents directly under the directory-like `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(ApiError::internal)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ApiError> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(ApiError::BadRequest("storage key cannot be empty".to_string()));
        }
        let relative = Path::new(trimmed);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(ApiError::BadRequest(format!(
                "storage key must be a relative path without '..': {}",
                key
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, ApiError> {
        let path = self.resolve(key)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ApiError::internal(err)),
        };
        let value = serde_json::from_str::<Value>(&contents).map_err(|err| {
            ApiError::Internal(format!("corrupt JSON at '{}': {}", key, err))
        })?;
        Ok(Some(value))
    }

    async fn put_json(&self, key: &str, value: &Value) -> Result<(), ApiError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ApiError::internal)?;
        }
        let body = serde_json::to_vec_pretty(value).map_err(ApiError::internal)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, ApiError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(ApiError::internal(err)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ApiError> {
        let prefix = prefix.trim().trim_end_matches('/');
        let dir = self.resolve(prefix)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ApiError::internal(err)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ApiError::internal)? {
            let is_file = entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                keys.push(format!("{}/{}", prefix, name));
            }
        }
        keys.sort();
        Ok(keys)
    }
}
