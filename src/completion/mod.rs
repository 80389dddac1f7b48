pub mod parser;
pub mod repair;
pub mod types;

#[cfg(test)]
mod tests;

pub use parser::parse;
pub use types::{
    wire_schema_json, ParseStrategy, RelevanceScore, StructuredCompletion, WireCompletion,
};
