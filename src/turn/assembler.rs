use serde::{Deserialize, Serialize};

use crate::completion::StructuredCompletion;
use crate::images::FilteredImageResult;
use crate::rag::Citation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShownImage {
    pub id: String,
    pub caption: String,
    pub context: String,
    /// Absent when images are shown without scores.
    pub score: Option<u8>,
}

/// What a caller receives for one turn. Arrays are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub answer_text: String,
    pub citations: Vec<Citation>,
    pub images: Vec<ShownImage>,
    pub should_include_images: bool,
}

pub fn assemble(
    completion: StructuredCompletion,
    images: FilteredImageResult,
    citations: Vec<Citation>,
) -> TurnResponse {
    let images: Vec<ShownImage> = images
        .images
        .into_iter()
        .map(|scored| ShownImage {
            context: scored.image.context(),
            id: scored.image.id,
            caption: scored.image.caption,
            score: scored.score,
        })
        .collect();

    TurnResponse {
        answer_text: completion.answer_text,
        should_include_images: !images.is_empty(),
        citations,
        images,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{ParseStrategy, RelevanceScore};
    use crate::images::{CandidateImage, FilterMode, ScoredImage};

    fn completion(include: bool) -> StructuredCompletion {
        StructuredCompletion {
            answer_text: "Cranes arrive in November.".to_string(),
            should_include_images: include,
            relevance_scores: vec![RelevanceScore::new("a", 90)],
            strategy: ParseStrategy::Direct,
        }
    }

    #[test]
    fn combines_parts_in_order() {
        let mut image = CandidateImage::new("a", "Cranes");
        image.context_before = "In winter".to_string();
        image.context_after = "they land.".to_string();
        let filtered = FilteredImageResult {
            images: vec![ScoredImage {
                image,
                score: Some(90),
            }],
            mode: FilterMode::Scored,
        };
        let citations = vec![Citation {
            source: "birds.pdf".to_string(),
            snippet: "Cranes...".to_string(),
        }];

        let response = assemble(completion(true), filtered, citations.clone());
        assert_eq!(response.answer_text, "Cranes arrive in November.");
        assert_eq!(response.citations, citations);
        assert_eq!(
            response.images,
            vec![ShownImage {
                id: "a".to_string(),
                caption: "Cranes".to_string(),
                context: "In winter they land.".to_string(),
                score: Some(90),
            }]
        );
        assert!(response.should_include_images);
    }

    #[test]
    fn empty_parts_serialize_as_empty_arrays() {
        let response = assemble(completion(true), FilteredImageResult::suppressed(), Vec::new());
        assert!(!response.should_include_images);

        let json = serde_json::to_value(&response).expect("json");
        assert_eq!(json["images"], serde_json::json!([]));
        assert_eq!(json["citations"], serde_json::json!([]));
    }
}
