use serde::{Deserialize, Serialize};

/// A piece of visual content available for a location, as presented to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateImage {
    /// Stable identifier the model must echo back (the file API URI).
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub context_before: String,
    #[serde(default)]
    pub context_after: String,
}

impl CandidateImage {
    pub fn new(id: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            caption: caption.into(),
            context_before: String::new(),
            context_after: String::new(),
        }
    }

    /// Surrounding document text, before and after joined with a single space.
    pub fn context(&self) -> String {
        let before = self.context_before.trim();
        let after = self.context_after.trim();
        match (before.is_empty(), after.is_empty()) {
            (true, true) => String::new(),
            (false, true) => before.to_string(),
            (true, false) => after.to_string(),
            (false, false) => format!("{} {}", before, after),
        }
    }
}

/// Registry entry written by the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// `area/site/doc/image_XXX`
    pub image_key: String,
    pub area: String,
    pub site: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub image_index: u32,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub context_before: String,
    #[serde(default)]
    pub context_after: String,
    #[serde(default)]
    pub gcs_path: String,
    #[serde(default)]
    pub file_api_uri: String,
    #[serde(default)]
    pub file_api_name: String,
    #[serde(default)]
    pub image_format: String,
}

impl ImageRecord {
    pub fn to_candidate(&self) -> CandidateImage {
        CandidateImage {
            id: self.file_api_uri.clone(),
            caption: self.caption.clone(),
            context_before: self.context_before.clone(),
            context_after: self.context_after.clone(),
        }
    }
}
