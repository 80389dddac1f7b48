use std::collections::HashMap;

use serde::Serialize;

use super::types::CandidateImage;
use crate::completion::StructuredCompletion;

pub const DEFAULT_RELEVANCE_THRESHOLD: u8 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredImage {
    pub image: CandidateImage,
    /// `None` when the model gave no scores at all and every candidate is shown.
    pub score: Option<u8>,
}

/// Which branch of the filter produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// The model said images do not belong in this reply.
    Suppressed,
    /// No usable scores; all candidates are returned unscored.
    Unscored,
    /// Threshold and ordering applied to scored candidates.
    Scored,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Suppressed => "suppressed",
            FilterMode::Unscored => "unscored",
            FilterMode::Scored => "scored",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredImageResult {
    pub images: Vec<ScoredImage>,
    pub mode: FilterMode,
}

impl FilteredImageResult {
    pub fn suppressed() -> Self {
        Self {
            images: Vec::new(),
            mode: FilterMode::Suppressed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

/// Selects the images to show for one turn.
///
/// Candidates the model scored below `threshold` are dropped. When the model scored some
/// candidates but not others, the unscored ones are dropped too; only a completely empty
/// score list falls back to showing every candidate.
pub fn filter_images(
    candidates: &[CandidateImage],
    completion: &StructuredCompletion,
    threshold: u8,
) -> FilteredImageResult {
    if !completion.should_include_images {
        tracing::debug!("Images suppressed by completion");
        return FilteredImageResult::suppressed();
    }

    // Duplicate ids: last write wins.
    let scores: HashMap<&str, u8> = completion
        .relevance_scores
        .iter()
        .map(|entry| (entry.image_id.as_str(), entry.score))
        .collect();

    if scores.is_empty() {
        tracing::debug!(
            "No relevance scores, showing all {} candidates",
            candidates.len()
        );
        return FilteredImageResult {
            images: candidates
                .iter()
                .cloned()
                .map(|image| ScoredImage { image, score: None })
                .collect(),
            mode: FilterMode::Unscored,
        };
    }

    let mut kept: Vec<(u8, &CandidateImage)> = candidates
        .iter()
        .filter_map(|image| {
            scores
                .get(image.id.as_str())
                .map(|score| (*score, image))
        })
        .filter(|(score, _)| *score >= threshold)
        .collect();
    // sort_by is stable, so equal scores keep catalog order.
    kept.sort_by(|a, b| b.0.cmp(&a.0));

    tracing::debug!(
        candidates = candidates.len(),
        scored = scores.len(),
        kept = kept.len(),
        threshold,
        "Filtered images by relevance"
    );

    FilteredImageResult {
        images: kept
            .into_iter()
            .map(|(score, image)| ScoredImage {
                image: image.clone(),
                score: Some(score),
            })
            .collect(),
        mode: FilterMode::Scored,
    }
}
