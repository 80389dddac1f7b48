//! Typed view over the validated YAML configuration.
//!
//! Every section is optional in the file; missing fields take the defaults below.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub images: ImageFilterConfig,
    pub completion: CompletionConfig,
    pub retrieval: RetrievalConfig,
    pub history: HistoryConfig,
    pub prompts: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// Image selection knobs threaded explicitly through each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageFilterConfig {
    /// Minimum relevance score (inclusive) an image needs to be shown.
    pub relevance_threshold: u8,
    /// How many catalog images are presented to the model per turn.
    pub max_images_per_turn: usize,
}

impl Default for ImageFilterConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 60,
            max_images_per_turn: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Ask the endpoint for `response_format: json_object`.
    pub json_mode: bool,
    /// Name of the environment variable holding the bearer key, if any.
    pub api_key_env: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            model: "local-model".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            json_mode: false,
            api_key_env: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub max_context_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_length: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of most recent history messages forwarded to the model.
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { window: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: defaults::DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: defaults::DEFAULT_USER_PROMPT.to_string(),
        }
    }
}
