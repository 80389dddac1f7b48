//! Conversation persistence.
//!
//! A conversation is created or resumed by id on each turn. Both sides of a successful turn are
//! appended, and the stored messages become the history of the next turn.

mod store;
mod types;

pub use store::{conversation_key, validate_conversation_id, ConversationStore};
pub use types::{Conversation, StoredMessage};
