pub mod completion;
pub mod conversations;
pub mod core;
pub mod images;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod storage;
pub mod turn;
