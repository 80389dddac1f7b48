//! Context builder.
//!
//! Scores passages by the share of query terms they contain, keeps the top-k and formats
//! them into a numbered context block with source citations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::types::{Citation, Passage, RetrievedContext};
use crate::core::config::RetrievalConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBuilderConfig {
    /// Maximum number of passages to include
    pub top_k: usize,
    /// Maximum total context length in characters
    pub max_context_length: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_length: 4000,
        }
    }
}

impl From<&RetrievalConfig> for ContextBuilderConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            max_context_length: config.max_context_length,
        }
    }
}

#[derive(Debug, Clone)]
struct ScoredPassage<'a> {
    passage: &'a Passage,
    score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextBuilderConfig,
}

impl ContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextBuilderConfig {
        &self.config
    }

    /// Build context from the passages most relevant to `query`.
    pub fn build(&self, passages: &[Passage], query: &str) -> RetrievedContext {
        let terms = query_terms(query);
        if passages.is_empty() || terms.is_empty() {
            return RetrievedContext::empty();
        }

        let mut scored: Vec<ScoredPassage<'_>> = passages
            .iter()
            .map(|passage| {
                let text = passage.text.to_lowercase();
                let hits = terms.iter().filter(|term| text.contains(term.as_str())).count();
                ScoredPassage {
                    passage,
                    score: hits as f64 / terms.len() as f64,
                }
            })
            .filter(|sp| sp.score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.config.top_k);

        self.format_context(&scored)
    }

    fn format_context(&self, scored: &[ScoredPassage<'_>]) -> RetrievedContext {
        let mut text = String::new();
        let mut citations = Vec::new();
        let mut current_length = 0;

        for sp in scored {
            let entry = format!(
                "[{}] (Source: {})\n{}\n\n",
                citations.len() + 1,
                sp.passage.source,
                sp.passage.text.trim()
            );
            let entry_length = entry.chars().count();
            if current_length + entry_length > self.config.max_context_length {
                break;
            }

            text.push_str(&entry);
            current_length += entry_length;
            citations.push(Citation::from_passage(sp.passage));
        }

        RetrievedContext {
            text: text.trim().to_string(),
            citations,
        }
    }
}

/// Lowercased query words with surrounding punctuation removed, duplicates dropped.
fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|term| !term.is_empty())
        .filter(|term| seen.insert(term.clone()))
        .collect()
}
