pub mod catalog;
pub mod filter;
pub mod types;

pub use catalog::{ImageCatalog, RegistryImageCatalog, REGISTRY_KEY};
pub use filter::{
    filter_images, FilterMode, FilteredImageResult, ScoredImage, DEFAULT_RELEVANCE_THRESHOLD,
};
pub use types::{CandidateImage, ImageRecord};
