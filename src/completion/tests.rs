//! Parser behaviour under well-formed, wrapped, truncated and hostile completions.

use proptest::prelude::*;

use super::parse;
use super::types::{ParseStrategy, RelevanceScore};

fn score(id: &str, value: u8) -> RelevanceScore {
    RelevanceScore::new(id, value)
}

// -------------------------------------------------------------------
// Fallback and totality
// -------------------------------------------------------------------

#[test]
fn plain_text_falls_back_to_show_all() {
    let parsed = parse("hello");
    assert_eq!(parsed.answer_text, "hello");
    assert!(parsed.should_include_images);
    assert!(parsed.relevance_scores.is_empty());
    assert_eq!(parsed.strategy, ParseStrategy::Fallback);
}

#[test]
fn empty_text_falls_back() {
    let parsed = parse("   \n");
    assert_eq!(parsed.answer_text, "");
    assert!(parsed.should_include_images);
    assert_eq!(parsed.strategy, ParseStrategy::Fallback);
}

#[test]
fn unrelated_json_is_not_a_structured_reply() {
    let raw = r#"Opening hours: {"mon": "9-17"}"#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Fallback);
    assert_eq!(parsed.answer_text, raw);
}

#[test]
fn prose_with_stray_braces_falls_back() {
    let raw = "Use {curly} braces } and { more";
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Fallback);
    assert_eq!(parsed.answer_text, raw);
}

proptest! {
    #[test]
    fn parse_is_total_for_arbitrary_text(raw in ".*") {
        let parsed = parse(&raw);
        prop_assert!(parsed.relevance_scores.iter().all(|s| s.score <= 100));
    }

    #[test]
    fn parse_is_total_for_truncated_documents(cut in 0usize..200) {
        let full = r#"{"answer_text": "שלום \"חברים\"\nלילה", "should_include_images": true, "relevance_scores": [{"image_id": "gs://b/a.jpg", "score": 90}, {"image_id": "gs://b/b.jpg", "score": 75.6}]}"#;
        let boundary = full
            .char_indices()
            .map(|(i, _)| i)
            .filter(|i| *i <= cut)
            .last()
            .unwrap_or(0);
        let parsed = parse(&full[..boundary]);
        prop_assert!(parsed.relevance_scores.len() <= 2);
    }

    #[test]
    fn parse_is_total_for_structural_noise(raw in r#"[\{\}\[\]",:\\a-z0-9 ]{0,64}"#) {
        let _ = parse(&raw);
    }
}

// -------------------------------------------------------------------
// Well-formed and wrapped documents
// -------------------------------------------------------------------

#[test]
fn direct_document_is_mapped() {
    let raw = r#"{"answer_text": "The lake hosts pelicans.", "should_include_images": true,
        "relevance_scores": [{"image_id": "a", "score": 90}, {"image_id": "b", "score": 30}]}"#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Direct);
    assert_eq!(parsed.answer_text, "The lake hosts pelicans.");
    assert!(parsed.should_include_images);
    assert_eq!(parsed.relevance_scores, vec![score("a", 90), score("b", 30)]);
}

#[test]
fn hebrew_answer_passes_through_unmodified() {
    let raw = r#"{"answer_text":"שלום","should_include_images":false,"relevance_scores":[]}"#;
    let parsed = parse(raw);
    assert_eq!(parsed.answer_text, "שלום");
    assert!(!parsed.should_include_images);
    assert!(parsed.relevance_scores.is_empty());
}

#[test]
fn code_fenced_document_is_extracted() {
    let raw = "```json\n{\"answer_text\": \"hi\", \"should_include_images\": false}\n```";
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Extracted);
    assert_eq!(parsed.answer_text, "hi");
    assert!(!parsed.should_include_images);
}

#[test]
fn commentary_around_document_is_ignored() {
    let raw = r#"Here is my answer: {"answer_text": "ok", "relevance_scores": []} Let me know!"#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Extracted);
    assert_eq!(parsed.answer_text, "ok");
}

#[test]
fn legacy_field_names_are_accepted() {
    let raw = r#"{"response_text": "legacy", "should_include_images": true,
        "image_relevance": [{"image_uri": "files/abc", "relevance_score": 88}]}"#;
    let parsed = parse(raw);
    assert_eq!(parsed.answer_text, "legacy");
    assert_eq!(parsed.relevance_scores, vec![score("files/abc", 88)]);
}

#[test]
fn raw_newlines_inside_strings_are_sanitized() {
    let raw = "{\"answer_text\": \"line one\nline two\", \"should_include_images\": false}";
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Sanitized);
    assert_eq!(parsed.answer_text, "line one\nline two");
    assert!(!parsed.should_include_images);
}

// -------------------------------------------------------------------
// Truncation repair
// -------------------------------------------------------------------

#[test]
fn truncated_mid_array_keeps_complete_entries() {
    let raw = r#"{"answer_text": "hi", "should_include_images": true, "relevance_scores": [{"image_id": "a", "score": 90}, {"image_id""#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Repaired);
    assert_eq!(parsed.answer_text, "hi");
    assert!(parsed.should_include_images);
    assert_eq!(parsed.relevance_scores, vec![score("a", 90)]);
}

#[test]
fn truncated_mid_answer_keeps_partial_text() {
    let raw = r#"{"answer_text": "The agamon is home to cranes and"#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Repaired);
    assert_eq!(parsed.answer_text, "The agamon is home to cranes and");
    assert!(parsed.should_include_images);
    assert!(parsed.relevance_scores.is_empty());
}

#[test]
fn truncated_after_flag_key_defaults_flag() {
    let raw = r#"{"answer_text": "hi", "should_include_images":"#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Repaired);
    assert_eq!(parsed.answer_text, "hi");
    assert!(parsed.should_include_images);
}

#[test]
fn truncated_inside_fence_is_repaired() {
    let raw = "```json\n{\"answer_text\": \"hi\", \"relevance_scores\": [{\"image_id\": \"a\", \"score\": 70}";
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Repaired);
    assert_eq!(parsed.relevance_scores, vec![score("a", 70)]);
}

#[test]
fn truncated_with_explicit_ellipsis() {
    let raw = r#"{"answer_text": "Birds gather at dusk..."#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Repaired);
    assert_eq!(parsed.answer_text, "Birds gather at dusk");
}

#[test]
fn broken_but_balanced_document_is_salvaged() {
    let raw = r#"{"answer_text": "Visit at dawn", "should_include_images": maybe}"#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Salvaged);
    assert_eq!(parsed.answer_text, "Visit at dawn");
    assert!(parsed.should_include_images);
    assert!(parsed.relevance_scores.is_empty());
}

#[test]
fn deeply_nested_truncation_is_parsed_quickly() {
    let raw = format!(r#"{{"answer_text": "x", "a": {}"#, "[".repeat(40_000));
    let started = std::time::Instant::now();
    let parsed = parse(&raw);
    assert!(
        started.elapsed() < std::time::Duration::from_secs(2),
        "took {:?}",
        started.elapsed()
    );
    assert_eq!(parsed.answer_text, "x");
    assert!(parsed.should_include_images);
}

#[test]
fn many_elements_before_truncation_are_parsed_quickly() {
    let entries = (0..20_000)
        .map(|i| format!(r#"{{"image_id": "img{}", "score": 50}}"#, i))
        .collect::<Vec<_>>()
        .join(", ");
    let raw = format!(r#"{{"answer_text": "x", "relevance_scores": [{}, {{"image_id"#, entries);
    let started = std::time::Instant::now();
    let parsed = parse(&raw);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(parsed.strategy, ParseStrategy::Repaired);
    assert_eq!(parsed.relevance_scores.len(), 20_000);
}

// -------------------------------------------------------------------
// Attempt ordering
// -------------------------------------------------------------------

#[test]
fn least_invasive_attempt_wins() {
    // The first object is complete; repair must not be reached even though a later,
    // truncated object is present.
    let raw = r#"{"answer_text": "first"} and then {"answer_text": "second"#;
    let parsed = parse(raw);
    assert_eq!(parsed.strategy, ParseStrategy::Extracted);
    assert_eq!(parsed.answer_text, "first");
}

#[test]
fn strategies_are_ordered_by_invasiveness() {
    assert!(ParseStrategy::Direct < ParseStrategy::Extracted);
    assert!(ParseStrategy::Extracted < ParseStrategy::Sanitized);
    assert!(ParseStrategy::Sanitized < ParseStrategy::Repaired);
    assert!(ParseStrategy::Repaired < ParseStrategy::Salvaged);
    assert!(ParseStrategy::Salvaged < ParseStrategy::Fallback);
}

// -------------------------------------------------------------------
// Double encoding
// -------------------------------------------------------------------

#[test]
fn document_encoded_as_string_is_decoded_once() {
    let inner = r#"{"answer_text": "inner", "should_include_images": false}"#;
    let raw = serde_json::to_string(inner).expect("encode");
    let parsed = parse(&raw);
    assert_eq!(parsed.strategy, ParseStrategy::Direct);
    assert_eq!(parsed.answer_text, "inner");
    assert!(!parsed.should_include_images);
}

#[test]
fn document_encoded_twice_is_not_recursed() {
    let inner = r#"{"answer_text": "deep"}"#;
    let once = serde_json::to_string(inner).expect("encode");
    let twice = serde_json::to_string(&once).expect("encode");
    let parsed = parse(&twice);
    assert_eq!(parsed.strategy, ParseStrategy::Fallback);
}

#[test]
fn answer_field_holding_a_document_is_unwrapped() {
    let inner = r#"{"answer_text": "unwrapped", "should_include_images": true, "relevance_scores": [{"image_id": "x", "score": 99}]}"#;
    let outer = serde_json::json!({ "answer_text": inner, "should_include_images": false });
    let parsed = parse(&outer.to_string());
    assert_eq!(parsed.answer_text, "unwrapped");
    assert!(parsed.should_include_images);
    assert_eq!(parsed.relevance_scores, vec![score("x", 99)]);
}

#[test]
fn quoted_answer_is_decoded_once() {
    let raw = r#"{"answer_text": "\"quoted \\\"twice\\\"\""}"#;
    let parsed = parse(raw);
    assert_eq!(parsed.answer_text, "quoted \"twice\"");
}

#[test]
fn answer_that_only_looks_like_json_is_kept() {
    let raw = r#"{"answer_text": "{not really json", "should_include_images": false}"#;
    let parsed = parse(raw);
    assert_eq!(parsed.answer_text, "{not really json");
    assert!(!parsed.should_include_images);
}

// -------------------------------------------------------------------
// Defensive field mapping
// -------------------------------------------------------------------

#[test]
fn missing_flag_defaults_to_true() {
    let parsed = parse(r#"{"answer_text": "x"}"#);
    assert!(parsed.should_include_images);
    assert!(parsed.relevance_scores.is_empty());
}

#[test]
fn string_flag_is_understood() {
    let parsed = parse(r#"{"answer_text": "x", "should_include_images": "False"}"#);
    assert!(!parsed.should_include_images);
    let parsed = parse(r#"{"answer_text": "x", "should_include_images": "yes please"}"#);
    assert!(parsed.should_include_images);
}

#[test]
fn non_array_scores_default_to_empty() {
    let parsed = parse(r#"{"answer_text": "x", "relevance_scores": {"a": 90}}"#);
    assert!(parsed.relevance_scores.is_empty());
}

#[test]
fn bad_entries_are_dropped_individually() {
    let raw = r#"{"answer_text": "x", "relevance_scores": [
        {"image_id": "ok", "score": 80},
        {"score": 90},
        {"image_id": "", "score": 90},
        {"image_id": "text-score", "score": "high"},
        "not an object",
        {"image_id": "float", "score": 61.6},
        {"image_id": "high", "score": 180},
        {"image_id": "low", "score": -3},
        {"image_id": "huge", "score": 18446744073709551615}
    ]}"#;
    let parsed = parse(raw);
    assert_eq!(
        parsed.relevance_scores,
        vec![
            score("ok", 80),
            score("float", 62),
            score("high", 100),
            score("low", 0),
            score("huge", 100),
        ]
    );
}

#[test]
fn missing_answer_uses_raw_text() {
    let raw = r#"{"should_include_images": false}"#;
    let parsed = parse(raw);
    assert_eq!(parsed.answer_text, raw);
    assert!(!parsed.should_include_images);
}
