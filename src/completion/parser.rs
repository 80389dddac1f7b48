//! Total parser from raw completion text to [`StructuredCompletion`].
//!
//! Attempts run from least to most invasive and the first one that yields an object carrying
//! at least one recognized field wins:
//! 1. the trimmed text as a JSON document
//! 2. a `{...}` span inside prose or code fences
//! 3. 1-2 again after escaping raw control characters inside strings
//! 4. truncation repair (close what is open, then cut back element by element)
//! 5. salvage of the answer string alone
//! 6. fallback: the raw text is the answer and all images may be shown

use serde_json::{Map, Value};

use super::repair;
use super::types::{ParseStrategy, RelevanceScore, StructuredCompletion};

const ANSWER_KEYS: [&str; 2] = ["answer_text", "response_text"];
const INCLUDE_IMAGES_KEY: &str = "should_include_images";
const SCORE_LIST_KEYS: [&str; 2] = ["relevance_scores", "image_relevance"];
const IMAGE_ID_KEYS: [&str; 3] = ["image_id", "image_uri", "uri"];
const SCORE_KEYS: [&str; 2] = ["score", "relevance_score"];

/// Parses one model completion. Never fails.
pub fn parse(raw_text: &str) -> StructuredCompletion {
    if let Some((object, strategy)) = locate_object(raw_text) {
        let completion = map_object(&object, raw_text, strategy);
        tracing::debug!(
            strategy = completion.strategy.as_str(),
            should_include_images = completion.should_include_images,
            scores = completion.relevance_scores.len(),
            "Parsed structured completion"
        );
        return completion;
    }

    if let Some(answer_text) = repair::salvage_string_field(raw_text, &ANSWER_KEYS) {
        tracing::debug!("Salvaged answer text from unparseable completion");
        return StructuredCompletion {
            answer_text,
            should_include_images: true,
            relevance_scores: Vec::new(),
            strategy: ParseStrategy::Salvaged,
        };
    }

    tracing::debug!("No structure in completion, using raw text");
    StructuredCompletion::fallback(raw_text)
}

fn locate_object(raw_text: &str) -> Option<(Map<String, Value>, ParseStrategy)> {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(object) = try_document(trimmed) {
        return Some((object, ParseStrategy::Direct));
    }
    if let Some(object) = try_spans(trimmed) {
        return Some((object, ParseStrategy::Extracted));
    }

    let sanitized = repair::escape_control_chars(trimmed);
    if let Some(text) = sanitized.as_deref() {
        if let Some(object) = try_document(text).or_else(|| try_spans(text)) {
            return Some((object, ParseStrategy::Sanitized));
        }
    }

    let base = sanitized.as_deref().unwrap_or(trimmed);
    let start = base.find('{')?;
    let repaired = repair::truncation_candidates(&base[start..])
        .find_map(|candidate| try_document(&candidate))
        .map(|object| (object, ParseStrategy::Repaired));
    repaired
}

fn try_spans(text: &str) -> Option<Map<String, Value>> {
    let matching = repair::matching_object_span(text);
    if let Some(object) = matching.and_then(try_document) {
        return Some(object);
    }
    let last = repair::last_brace_span(text)?;
    if Some(last) == matching {
        return None;
    }
    try_document(last)
}

fn try_document(text: &str) -> Option<Map<String, Value>> {
    let value = serde_json::from_str::<Value>(text).ok()?;
    match value {
        Value::Object(object) if is_structured(&object) => Some(unwrap_nested_answer(object)),
        // A whole document encoded as a JSON string; decoded one level only.
        Value::String(inner) => match serde_json::from_str::<Value>(inner.trim()).ok()? {
            Value::Object(object) if is_structured(&object) => Some(object),
            _ => None,
        },
        _ => None,
    }
}

fn is_structured(object: &Map<String, Value>) -> bool {
    ANSWER_KEYS
        .iter()
        .chain(SCORE_LIST_KEYS.iter())
        .chain(std::iter::once(&INCLUDE_IMAGES_KEY))
        .any(|key| object.contains_key(*key))
}

/// Replaces `object` with the document encoded in its answer field, if there is one.
fn unwrap_nested_answer(object: Map<String, Value>) -> Map<String, Value> {
    let inner = answer_field(&object)
        .map(str::trim)
        .filter(|text| text.starts_with('{'))
        .and_then(|text| serde_json::from_str::<Value>(text).ok());

    match inner {
        Some(Value::Object(inner)) if ANSWER_KEYS.iter().any(|k| inner.contains_key(*k)) => {
            tracing::debug!("Unwrapped double-encoded completion document");
            inner
        }
        _ => object,
    }
}

fn answer_field(object: &Map<String, Value>) -> Option<&str> {
    ANSWER_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
}

fn map_object(
    object: &Map<String, Value>,
    raw_text: &str,
    strategy: ParseStrategy,
) -> StructuredCompletion {
    let answer_text = match answer_field(object) {
        Some(text) => decode_quoted(text),
        None => raw_text.trim().to_string(),
    };

    let should_include_images = match object.get(INCLUDE_IMAGES_KEY) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) if text.trim().eq_ignore_ascii_case("false") => false,
        _ => true,
    };

    let relevance_scores = SCORE_LIST_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .map(|entries| entries.iter().filter_map(score_entry).collect())
        .unwrap_or_default();

    StructuredCompletion {
        answer_text,
        should_include_images,
        relevance_scores,
        strategy,
    }
}

/// An answer that is itself a quoted JSON string is decoded once.
fn decode_quoted(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        if let Ok(decoded) = serde_json::from_str::<String>(trimmed) {
            return decoded;
        }
    }
    text.to_string()
}

fn score_entry(entry: &Value) -> Option<RelevanceScore> {
    let fields = entry.as_object()?;
    let image_id = IMAGE_ID_KEYS.iter().find_map(|key| {
        fields
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
    })?;
    let score = SCORE_KEYS
        .iter()
        .find_map(|key| fields.get(*key).and_then(clamp_score))?;
    Some(RelevanceScore::new(image_id, score))
}

fn clamp_score(value: &Value) -> Option<u8> {
    if let Some(n) = value.as_i64() {
        return Some(n.clamp(0, 100) as u8);
    }
    if value.as_u64().is_some() {
        return Some(100);
    }
    let n = value.as_f64()?;
    n.is_finite().then(|| n.round().clamp(0.0, 100.0) as u8)
}
