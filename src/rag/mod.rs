//! Retrieval collaborator.
//!
//! - `PassageRetriever`: loads a location's passages from the object store and keyword-ranks them
//! - `ContextBuilder`: selects top-k passages and formats them into prompt context with citations
//! - `LocationRegistry`: which (area, site) pairs have a corpus

mod context_builder;
mod locations;
mod retriever;
mod types;

pub use context_builder::{ContextBuilder, ContextBuilderConfig};
pub use locations::{Location, LocationRegistry, LOCATION_REGISTRY_KEY};
pub use retriever::{passage_key, PassageRetriever, Retriever};
pub use types::{Citation, Passage, RetrievedContext, SNIPPET_PREVIEW_CHARS};
