use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::CompletionProvider;
use super::types::ChatRequest;
use crate::core::config::CompletionConfig;
use crate::core::errors::ApiError;

/// Chat completions against any endpoint speaking the OpenAI `/v1/chat/completions` dialect.
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client: Client::new(),
        }
    }

    /// Builds a provider from config, reading the key from the configured env var once.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, ApiError> {
        reqwest::Url::parse(&config.base_url).map_err(|err| {
            ApiError::BadRequest(format!(
                "completion.base_url '{}' is not a valid URL: {}",
                config.base_url, err
            ))
        })?;

        let api_key = config.api_key_env.as_deref().and_then(|name| {
            let key = std::env::var(name).ok();
            if key.is_none() {
                tracing::warn!("Completion API key variable {} is not set", name);
            }
            key
        });
        Ok(Self::new(
            config.base_url.clone(),
            config.model.clone(),
            api_key,
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
            if request.json_mode {
                obj.insert(
                    "response_format".to_string(),
                    json!({ "type": "json_object" }),
                );
            }
        }

        body
    }
}

fn extract_content(payload: &Value) -> Result<String, ApiError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ApiError::Internal("completion response has no message content".to_string()))
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.request_body(&request);

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = builder.send().await.map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "completion endpoint returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        extract_content(&payload)
    }
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn body_carries_options() {
        let provider = OpenAiCompatibleProvider::new(
            "http://localhost:1234/".to_string(),
            "m".to_string(),
            None,
        );
        assert_eq!(provider.base_url(), "http://localhost:1234");

        let mut request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let body = provider.request_body(&request);
        assert!(body.get("temperature").is_none());
        assert!(body.get("response_format").is_none());

        request.temperature = Some(0.2);
        request.max_tokens = Some(64);
        request.json_mode = true;
        let body = provider.request_body(&request);
        assert_eq!(body["model"], "m");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn content_is_first_choice() {
        let payload = json!({"choices": [{"message": {"content": "{\"answer_text\": \"x\"}"}}]});
        assert_eq!(extract_content(&payload).expect("content"), "{\"answer_text\": \"x\"}");
        assert!(extract_content(&json!({"choices": []})).is_err());
    }

    #[test]
    fn config_with_invalid_url_is_rejected() {
        let mut config = CompletionConfig::default();
        assert!(OpenAiCompatibleProvider::from_config(&config).is_ok());

        config.base_url = "not a url".to_string();
        assert!(OpenAiCompatibleProvider::from_config(&config).is_err());
    }

    #[test]
    fn blank_key_is_ignored() {
        let provider =
            OpenAiCompatibleProvider::new("http://x".to_string(), "m".to_string(), Some(" ".into()));
        assert!(provider.api_key.is_none());
    }
}
