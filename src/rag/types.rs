use serde::{Deserialize, Serialize};

/// Characters of passage text kept as a citation snippet.
pub const SNIPPET_PREVIEW_CHARS: usize = 200;

/// One unit of a location's document corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub snippet: String,
}

impl Citation {
    pub fn from_passage(passage: &Passage) -> Self {
        Self {
            source: passage.source.clone(),
            snippet: passage.text.chars().take(SNIPPET_PREVIEW_CHARS).collect(),
        }
    }
}

/// Prompt context plus the citations it was built from, in context order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl RetrievedContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.citations.is_empty()
    }
}
