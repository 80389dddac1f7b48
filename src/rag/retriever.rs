use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::context_builder::ContextBuilder;
use super::types::{Passage, RetrievedContext};
use crate::core::errors::ApiError;
use crate::storage::ObjectStore;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Grounding context for `query` at one location.
    async fn retrieve(
        &self,
        query: &str,
        area: &str,
        site: &str,
    ) -> Result<RetrievedContext, ApiError>;
}

/// Object-store key holding the passages of one location.
pub fn passage_key(area: &str, site: &str) -> String {
    format!("chunks/{}/{}.json", area, site)
}

/// Keyword retrieval over passages stored per location as `[{source, text}]`.
pub struct PassageRetriever {
    store: Arc<dyn ObjectStore>,
    builder: ContextBuilder,
}

impl PassageRetriever {
    pub fn new(store: Arc<dyn ObjectStore>, builder: ContextBuilder) -> Self {
        Self { store, builder }
    }

    pub async fn load_passages(&self, area: &str, site: &str) -> Result<Vec<Passage>, ApiError> {
        let key = passage_key(area, site);
        match self.store.get_json(&key).await? {
            None => Ok(Vec::new()),
            Some(value @ Value::Array(_)) => serde_json::from_value(value).map_err(|err| {
                ApiError::Internal(format!("invalid passages at '{}': {}", key, err))
            }),
            Some(_) => Err(ApiError::Internal(format!(
                "passages at '{}' must be an array",
                key
            ))),
        }
    }

    /// Replaces the passages stored for a location.
    pub async fn store_passages(
        &self,
        area: &str,
        site: &str,
        passages: &[Passage],
    ) -> Result<(), ApiError> {
        let value = serde_json::to_value(passages).map_err(ApiError::internal)?;
        self.store.put_json(&passage_key(area, site), &value).await
    }
}

#[async_trait]
impl Retriever for PassageRetriever {
    async fn retrieve(
        &self,
        query: &str,
        area: &str,
        site: &str,
    ) -> Result<RetrievedContext, ApiError> {
        let passages = self.load_passages(area, site).await?;
        let context = self.builder.build(&passages, query);
        tracing::debug!(
            "Retrieved {} of {} passages for {}/{}",
            context.citations.len(),
            passages.len(),
            area,
            site
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalObjectStore;

    fn retriever(dir: &tempfile::TempDir) -> PassageRetriever {
        let store = LocalObjectStore::new(dir.path()).expect("store");
        PassageRetriever::new(Arc::new(store), ContextBuilder::default())
    }

    #[tokio::test]
    async fn missing_location_has_no_context() {
        let dir = tempfile::tempdir().expect("tempdir");
        let context = retriever(&dir)
            .retrieve("cranes", "hefer", "agamon")
            .await
            .expect("retrieve");
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn stored_passages_are_ranked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let retriever = retriever(&dir);
        retriever
            .store_passages(
                "hefer",
                "agamon",
                &[
                    Passage {
                        source: "hours.pdf".to_string(),
                        text: "Open daily from 8am.".to_string(),
                    },
                    Passage {
                        source: "birds.pdf".to_string(),
                        text: "Thousands of cranes stop here each winter.".to_string(),
                    },
                ],
            )
            .await
            .expect("seed");

        let context = retriever
            .retrieve("When do the cranes arrive?", "hefer", "agamon")
            .await
            .expect("retrieve");
        assert_eq!(context.citations.len(), 1);
        assert_eq!(context.citations[0].source, "birds.pdf");
        assert!(context.text.contains("(Source: birds.pdf)"));
    }

    #[tokio::test]
    async fn non_array_document_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalObjectStore::new(dir.path()).expect("store");
        store
            .put_json(&passage_key("hefer", "agamon"), &serde_json::json!({"text": "x"}))
            .await
            .expect("seed");
        let retriever = PassageRetriever::new(Arc::new(store), ContextBuilder::default());
        assert!(retriever.retrieve("x", "hefer", "agamon").await.is_err());
    }

    #[tokio::test]
    async fn traversal_in_location_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(retriever(&dir).retrieve("x", "..", "etc").await.is_err());
    }
}
