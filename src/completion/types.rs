use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One model-assigned relevance score, already clamped into 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceScore {
    pub image_id: String,
    pub score: u8,
}

impl RelevanceScore {
    pub fn new(image_id: impl Into<String>, score: u8) -> Self {
        Self {
            image_id: image_id.into(),
            score: score.min(100),
        }
    }
}

/// Which parse attempt produced a [`StructuredCompletion`], least invasive first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// The trimmed text was a JSON document.
    Direct,
    /// A `{...}` span inside surrounding prose or code fences parsed.
    Extracted,
    /// Raw control characters inside string literals had to be escaped.
    Sanitized,
    /// A truncated document was closed or cut back to an element boundary.
    Repaired,
    /// Only the answer string could be recovered.
    Salvaged,
    /// Nothing structured was found; the raw text is the answer.
    Fallback,
}

impl ParseStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseStrategy::Direct => "direct",
            ParseStrategy::Extracted => "extracted",
            ParseStrategy::Sanitized => "sanitized",
            ParseStrategy::Repaired => "repaired",
            ParseStrategy::Salvaged => "salvaged",
            ParseStrategy::Fallback => "fallback",
        }
    }
}

/// The validated shape of one model turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredCompletion {
    pub answer_text: String,
    pub should_include_images: bool,
    pub relevance_scores: Vec<RelevanceScore>,
    pub strategy: ParseStrategy,
}

impl StructuredCompletion {
    /// Degraded result used when no structure can be recovered: every image may be shown.
    pub fn fallback(raw_text: &str) -> Self {
        Self {
            answer_text: raw_text.trim().to_string(),
            should_include_images: true,
            relevance_scores: Vec::new(),
            strategy: ParseStrategy::Fallback,
        }
    }
}

/// Wire format the model is asked to emit. Only used to publish a JSON schema in the prompt;
/// parsing goes through the tolerant mapper in `parser`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireCompletion {
    /// The reply shown to the user, in the language of the question.
    pub answer_text: String,
    /// False for greetings and small talk; true when images support the answer.
    pub should_include_images: bool,
    /// One entry per presented image that is relevant to the answer.
    #[serde(default)]
    pub relevance_scores: Vec<WireRelevanceScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireRelevanceScore {
    /// The exact image id from the list of available images.
    pub image_id: String,
    /// 0-100. Images scoring below the display threshold are not shown.
    #[schemars(range(min = 0, max = 100))]
    pub score: u8,
}

/// Pretty-printed JSON schema of [`WireCompletion`] for prompt templates.
pub fn wire_schema_json() -> String {
    let schema = schemars::schema_for!(WireCompletion);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}
