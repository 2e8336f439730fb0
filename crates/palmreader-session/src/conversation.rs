//! Chat with the spiritual guide.
//!
//! Each turn is persisted before and after the remote call, so a failed
//! request still leaves the user's own message in history.

use std::sync::Arc;

use palmreader_store::{ChatMessage, ChatStore, Role};
use tracing::{info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::gateway::{GuidanceTopic, InferenceGateway, InferenceRequest};

pub struct Conversation {
    chats: ChatStore,
    gateway: Arc<dyn InferenceGateway>,
}

impl Conversation {
    pub fn new(chats: ChatStore, gateway: Arc<dyn InferenceGateway>) -> Self {
        Self { chats, gateway }
    }

    /// Send one user message and return the assistant's stored reply.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub async fn send(&self, content: &str, language: &str) -> Result<ChatMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        self.chats.add(Role::User, content).await?;
        let history = self.chats.history().await?;

        let request = InferenceRequest::guidance(GuidanceTopic::Chat, &history, language);
        let response = self.gateway.infer(request).await.inspect_err(|err| {
            warn!(%err, "guide did not answer");
        })?;

        let reply = self.chats.add(Role::Assistant, &response.text).await?;
        info!(turns = history.len() + 1, "chat turn complete");
        Ok(reply)
    }

    pub async fn history(&self) -> Result<Vec<ChatMessage>> {
        Ok(self.chats.history().await?)
    }

    pub async fn clear(&self) -> Result<()> {
        Ok(self.chats.clear().await?)
    }
}

// ── tests ────────────────────────────────────────────────────────────
