use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::assembler::{assemble, TurnResponse};
use super::prompt::{format_image_block, history_window, PromptTemplate, PromptVars};
use crate::completion;
use crate::core::config::{AppConfig, ImageFilterConfig};
use crate::core::errors::TurnError;
use crate::images::{filter_images, CandidateImage, ImageCatalog};
use crate::llm::{ChatMessage, ChatRequest, CompletionProvider};
use crate::rag::{RetrievedContext, Retriever};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub query: String,
    pub area: String,
    pub site: String,
    /// Conversation to resume; a new one is started when absent or unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Earlier messages of the conversation, oldest first, excluding `query`. Replaced by the
    /// stored messages when the conversation already has some.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl TurnRequest {
    pub fn new(query: impl Into<String>, area: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            area: area.into(),
            site: site.into(),
            conversation_id: None,
            history: Vec::new(),
        }
    }
}

/// Per-deployment knobs for a turn, passed in explicitly.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub images: ImageFilterConfig,
    pub history_window: usize,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            images: ImageFilterConfig::default(),
            history_window: 10,
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }
}

impl TurnSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            images: config.images,
            history_window: config.history.window,
            temperature: Some(config.completion.temperature),
            max_tokens: Some(config.completion.max_tokens),
            json_mode: config.completion.json_mode,
        }
    }
}

/// Runs one question/answer turn. Holds no per-turn state; share it behind an `Arc`.
pub struct TurnOrchestrator {
    catalog: Arc<dyn ImageCatalog>,
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn CompletionProvider>,
    prompt: PromptTemplate,
    settings: TurnSettings,
}

impl TurnOrchestrator {
    pub fn new(
        catalog: Arc<dyn ImageCatalog>,
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn CompletionProvider>,
        prompt: PromptTemplate,
        settings: TurnSettings,
    ) -> Self {
        let prompt = prompt.with_threshold(settings.images.relevance_threshold);
        Self {
            catalog,
            retriever,
            provider,
            prompt,
            settings,
        }
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn answer(&self, request: &TurnRequest) -> Result<TurnResponse, TurnError> {
        let started = Instant::now();
        let area = request.area.as_str();
        let site = request.site.as_str();

        let (candidates, context) = tokio::join!(
            self.presented_images(area, site),
            self.retrieved_context(&request.query, area, site)
        );

        let images_block = format_image_block(&candidates);
        let vars = PromptVars {
            area,
            site,
            question: &request.query,
            context: &context.text,
            images: &images_block,
        };

        let mut messages = vec![ChatMessage::system(self.prompt.render_system(&vars))];
        messages.extend(history_window(
            &request.history,
            self.settings.history_window,
        ));
        messages.push(ChatMessage::user(self.prompt.render_user(&vars)));

        let chat = ChatRequest {
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            json_mode: self.settings.json_mode,
        };

        let raw = self
            .provider
            .complete(chat)
            .await
            .map_err(|err| TurnError::CompletionUnavailable(err.to_string()))?;

        let parsed = completion::parse(&raw);
        let strategy = parsed.strategy;
        let filtered = filter_images(
            &candidates,
            &parsed,
            self.settings.images.relevance_threshold,
        );
        let filter_mode = filtered.mode;
        let response = assemble(parsed, filtered, context.citations);

        tracing::info!(
            area,
            site,
            citations = response.citations.len(),
            candidates = candidates.len(),
            images = response.images.len(),
            should_include_images = response.should_include_images,
            parse_strategy = strategy.as_str(),
            filter_mode = filter_mode.as_str(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Turn answered"
        );

        Ok(response)
    }

    /// The first `max_images_per_turn` catalog images; none when the catalog fails.
    async fn presented_images(&self, area: &str, site: &str) -> Vec<CandidateImage> {
        match self.catalog.get_images(area, site).await {
            Ok(mut images) => {
                images.truncate(self.settings.images.max_images_per_turn);
                images
            }
            Err(err) => {
                tracing::warn!("Image catalog unavailable for {}/{}: {}", area, site, err);
                Vec::new()
            }
        }
    }

    async fn retrieved_context(&self, query: &str, area: &str, site: &str) -> RetrievedContext {
        match self.retriever.retrieve(query, area, site).await {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!("Retrieval failed for {}/{}: {}", area, site, err);
                RetrievedContext::empty()
            }
        }
    }
}
