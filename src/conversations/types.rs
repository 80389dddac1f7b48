use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;
use crate::rag::Citation;
use crate::turn::ShownImage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ShownImage>>,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            citations: None,
            images: None,
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        citations: Vec<Citation>,
        images: Vec<ShownImage>,
    ) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            citations: Some(citations),
            images: Some(images),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub area: String,
    pub site: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

impl Conversation {
    pub fn new(
        conversation_id: impl Into<String>,
        area: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            area: area.into(),
            site: site.into(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }

    /// Stored messages as model chat history, oldest first.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|msg| ChatMessage::new(msg.role.clone(), msg.content.clone()))
            .collect()
    }

    /// Time of the newest message, or of the last save when there are none.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.messages
            .iter()
            .map(|msg| msg.timestamp)
            .max()
            .unwrap_or(self.updated_at)
    }
}
