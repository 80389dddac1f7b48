//! Prompt construction for one turn.
//!
//! Templates use `{name}` placeholders. Substitution runs in a single pass, so text that is
//! inserted (the JSON schema, retrieved passages, the user's question) is never re-expanded.
//! Unknown `{...}` sequences are left as they are. `{schema}` and `{threshold}` are fixed per
//! template; the rest vary per turn.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::completion::wire_schema_json;
use crate::core::config::PromptConfig;
use crate::images::{CandidateImage, DEFAULT_RELEVANCE_THRESHOLD};
use crate::llm::ChatMessage;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{(area|site|question|context|images|schema|threshold)\}")
            .expect("static regex")
    })
}

/// Values substituted into the templates.
#[derive(Debug, Clone, Copy)]
pub struct PromptVars<'a> {
    pub area: &'a str,
    pub site: &'a str,
    pub question: &'a str,
    pub context: &'a str,
    pub images: &'a str,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system_prompt: String,
    user_prompt: String,
    schema: String,
    threshold: u8,
}

impl PromptTemplate {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            schema: wire_schema_json(),
            threshold: DEFAULT_RELEVANCE_THRESHOLD,
        }
    }

    /// Sets the score below which images are not shown, as stated to the model.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(config.system_prompt.clone(), config.user_prompt.clone())
    }

    pub fn render_system(&self, vars: &PromptVars<'_>) -> String {
        self.render(&self.system_prompt, vars)
    }

    pub fn render_user(&self, vars: &PromptVars<'_>) -> String {
        self.render(&self.user_prompt, vars)
    }

    fn render(&self, template: &str, vars: &PromptVars<'_>) -> String {
        placeholder_re()
            .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
                "area" => vars.area.to_string(),
                "site" => vars.site.to_string(),
                "question" => vars.question.to_string(),
                "context" => vars.context.to_string(),
                "images" => vars.images.to_string(),
                "schema" => self.schema.clone(),
                "threshold" => self.threshold.to_string(),
                other => format!("{{{}}}", other),
            })
            .into_owned()
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

/// One line per presented image: id, caption and surrounding context.
pub fn format_image_block(images: &[CandidateImage]) -> String {
    if images.is_empty() {
        return "(no images available for this location)".to_string();
    }

    images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            let mut line = format!("{}. id: {}", i + 1, image.id);
            if !image.caption.trim().is_empty() {
                line.push_str(&format!(" | caption: {}", image.caption.trim()));
            }
            let context = image.context();
            if !context.is_empty() {
                line.push_str(&format!(" | context: {}", context));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keeps the last `window` messages, then drops empty ones and unknown roles.
/// `model` is accepted as an alias of `assistant`.
pub fn history_window(history: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .filter(|msg| !msg.content.trim().is_empty())
        .filter_map(|msg| match msg.role.as_str() {
            "user" => Some(ChatMessage::user(msg.content.clone())),
            "assistant" | "model" => Some(ChatMessage::assistant(msg.content.clone())),
            _ => None,
        })
        .collect()
}
