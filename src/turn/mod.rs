pub mod assembler;
pub mod orchestrator;
pub mod prompt;


pub use assembler::{assemble, ShownImage, TurnResponse};
pub use orchestrator::{TurnOrchestrator, TurnRequest, TurnSettings};
pub use prompt::{PromptTemplate, PromptVars};
