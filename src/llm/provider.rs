use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// return the provider name (e.g. "openai_compatible")
    fn name(&self) -> &str;

    /// one non-streaming chat completion; returns the raw model text
    async fn complete(&self, request: ChatRequest) -> Result<String, ApiError>;
}
