//! Persistent chat history with the spiritual guide.
//!
//! An append-only log in the `chats` collection. Message ids are assigned
//! by the engine in insertion order, so [`ChatStore::history`] is already
//! chronological.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::schema::CHATS;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Engine-assigned, strictly increasing.
    pub id: i64,
    pub role: Role,
    pub content: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// Append-only access to the `chats` collection.
#[derive(Clone, Debug)]
pub struct ChatStore {
    db: Database,
}

impl ChatStore {
    /// Create a new chat store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a message; the store assigns its id and timestamp.
    #[instrument(skip(self, content))]
    pub async fn add(&self, role: Role, content: &str) -> StoreResult<ChatMessage> {
        let timestamp = Utc::now().timestamp_millis();
        let key = self
            .db
            .add(
                CHATS,
                json!({ "role": role, "content": content, "timestamp": timestamp }),
            )
            .await?;

        let id = key.as_int().ok_or_else(|| {
            StoreError::InvalidArgument(format!("chat key {key} is not an integer"))
        })?;
        debug!(message_id = id, role = role.as_str(), "chat message appended");

        Ok(ChatMessage {
            id,
            role,
            content: content.to_owned(),
            timestamp,
        })
    }

    /// All messages in insertion order.
    #[instrument(skip(self))]
    pub async fn history(&self) -> StoreResult<Vec<ChatMessage>> {
        self.db
            .get_all(CHATS)
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    /// Remove every message. Calling it on an empty history is a no-op.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> StoreResult<()> {
        self.db.clear(CHATS).await?;
        debug!("chat history cleared");
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
