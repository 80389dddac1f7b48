use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{Conversation, StoredMessage};
use crate::core::errors::ApiError;
use crate::storage::ObjectStore;

const PREFIX: &str = "conversations";
const MAX_ID_LEN: usize = 128;

/// Object-store key of one conversation.
pub fn conversation_key(conversation_id: &str) -> String {
    format!("{}/{}.json", PREFIX, conversation_id)
}

/// Ids become store keys, so only `[A-Za-z0-9_-]` is accepted.
pub fn validate_conversation_id(conversation_id: &str) -> Result<(), ApiError> {
    let valid = !conversation_id.is_empty()
        && conversation_id.len() <= MAX_ID_LEN
        && conversation_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "invalid conversation id: {}",
            conversation_id
        )))
    }
}

/// Conversations persisted as one JSON document each under `conversations/`.
pub struct ConversationStore {
    store: Arc<dyn ObjectStore>,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Loads a conversation. A document that no longer matches the conversation shape is
    /// treated as missing.
    pub async fn get(&self, conversation_id: &str) -> Result<Option<Conversation>, ApiError> {
        validate_conversation_id(conversation_id)?;
        let key = conversation_key(conversation_id);
        let Some(value) = self.store.get_json(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<Conversation>(value) {
            Ok(conversation) => {
                tracing::debug!(
                    "Loaded conversation {} ({} messages)",
                    conversation_id,
                    conversation.messages.len()
                );
                Ok(Some(conversation))
            }
            Err(err) => {
                tracing::warn!("Ignoring unreadable conversation at '{}': {}", key, err);
                Ok(None)
            }
        }
    }

    /// The stored conversation with `conversation_id`, or a new unsaved one. A missing id gets
    /// a fresh UUID; an unknown id is kept for the new conversation.
    pub async fn get_or_create(
        &self,
        conversation_id: Option<&str>,
        area: &str,
        site: &str,
    ) -> Result<Conversation, ApiError> {
        if let Some(id) = conversation_id {
            if let Some(conversation) = self.get(id).await? {
                return Ok(conversation);
            }
            tracing::info!("Conversation {} not found, starting it", id);
            return Ok(Conversation::new(id, area, site));
        }
        Ok(Conversation::new(Uuid::new_v4().to_string(), area, site))
    }

    pub async fn save(&self, conversation: &mut Conversation) -> Result<(), ApiError> {
        conversation.updated_at = Utc::now();
        let value = serde_json::to_value(&*conversation).map_err(ApiError::internal)?;
        self.store
            .put_json(&conversation_key(&conversation.conversation_id), &value)
            .await?;
        tracing::debug!(
            "Saved conversation {} ({} messages)",
            conversation.conversation_id,
            conversation.messages.len()
        );
        Ok(())
    }

    /// Appends `messages` and saves the conversation.
    pub async fn append(
        &self,
        conversation: &mut Conversation,
        messages: impl IntoIterator<Item = StoredMessage> + Send,
    ) -> Result<(), ApiError> {
        conversation.messages.extend(messages);
        self.save(conversation).await
    }

    /// Returns `false` when there was no such conversation.
    pub async fn delete(&self, conversation_id: &str) -> Result<bool, ApiError> {
        validate_conversation_id(conversation_id)?;
        let deleted = self.store.delete(&conversation_key(conversation_id)).await?;
        if deleted {
            tracing::info!("Deleted conversation {}", conversation_id);
        }
        Ok(deleted)
    }

    /// Deletes every conversation whose id starts with `id_prefix` and whose newest message is
    /// older than `cutoff`. Returns how many were deleted.
    pub async fn delete_inactive_since(
        &self,
        cutoff: DateTime<Utc>,
        id_prefix: &str,
    ) -> Result<usize, ApiError> {
        let mut deleted = 0;
        for key in self.store.list(PREFIX).await? {
            let Some(id) = key
                .strip_prefix(PREFIX)
                .and_then(|rest| rest.strip_prefix('/'))
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };
            if !id.starts_with(id_prefix) || validate_conversation_id(id).is_err() {
                continue;
            }
            let Some(conversation) = self.get(id).await? else {
                continue;
            };
            if conversation.last_activity() < cutoff && self.store.delete(&key).await? {
                deleted += 1;
            }
        }
        tracing::info!(
            "Deleted {} conversation(s) inactive since {}",
            deleted,
            cutoff.to_rfc3339()
        );
        Ok(deleted)
    }
}
