//! Contract for the remote inference service.
//!
//! Palm analysis and guidance text come from a hosted model. The session
//! layer only depends on [`InferenceGateway`]; transport, credentials and
//! prompt construction live behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use palmreader_store::ChatMessage;

/// Subject a guidance request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceTopic {
    Tarot,
    Horoscope,
    Chat,
}

/// What the service is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "topic", rename_all = "snake_case")]
pub enum InferenceKind {
    /// Describe a palm from an image.
    PalmVision,
    /// Produce text guidance.
    Guidance(GuidanceTopic),
}

/// One request to the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub kind: InferenceKind,
    pub payload: Value,
    /// Language the reply should be written in.
    pub language: String,
}

impl InferenceRequest {
    /// Palm analysis of a base64 encoded image.
    pub fn palm(image: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            kind: InferenceKind::PalmVision,
            payload: json!({ "image": image.into() }),
            language: language.into(),
        }
    }

    /// Guidance for `topic`, given the conversation so far.
    pub fn guidance(
        topic: GuidanceTopic,
        messages: &[ChatMessage],
        language: impl Into<String>,
    ) -> Self {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();
        Self {
            kind: InferenceKind::Guidance(topic),
            payload: json!({ "messages": messages }),
            language: language.into(),
        }
    }
}

/// The service's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub text: String,
    /// Full response body, for callers that need more than the text.
    #[serde(default)]
    pub raw: Value,
}

impl InferenceResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: Value::Null,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("inference credential is not configured")]
    MissingCredential,

    #[error("inference transport error: {0}")]
    Transport(String),

    #[error("inference request rejected: {0}")]
    Rejected(String),
}

/// A remote model that answers [`InferenceRequest`]s.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, GatewayError>;
}

/// Gateway used when no service is configured: every call fails with
/// [`GatewayError::MissingCredential`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

#[async_trait]
impl InferenceGateway for Unconfigured {
    async fn infer(&self, _request: InferenceRequest) -> Result<InferenceResponse, GatewayError> {
        Err(GatewayError::MissingCredential)
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use palmreader_store::Role;

    use super::*;

    #[test]
    fn guidance_payload_carries_roles() {
        let messages = vec![
            ChatMessage {
                id: 1,
                role: Role::User,
                content: "will it rain?".into(),
                timestamp: 1,
            },
            ChatMessage {
                id: 2,
                role: Role::Assistant,
                content: "bring a coat".into(),
                timestamp: 2,
            },
        ];
        let req = InferenceRequest::guidance(GuidanceTopic::Chat, &messages, "fr");

        assert_eq!(req.kind, InferenceKind::Guidance(GuidanceTopic::Chat));
        assert_eq!(req.language, "fr");
        assert_eq!(
            req.payload["messages"],
            json!([
                { "role": "user", "content": "will it rain?" },
                { "role": "assistant", "content": "bring a coat" },
            ])
        );
    }

    #[test]
    fn kind_serializes_with_topic() {
        let v = serde_json::to_value(InferenceKind::Guidance(GuidanceTopic::Tarot)).unwrap();
        assert_eq!(v, json!({ "kind": "guidance", "topic": "tarot" }));
        let v = serde_json::to_value(InferenceKind::PalmVision).unwrap();
        assert_eq!(v, json!({ "kind": "palm_vision" }));
    }

    #[tokio::test]
    async fn unconfigured_gateway_refuses() {
        let err = Unconfigured
            .infer(InferenceRequest::palm("aGk=", "en"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredential));
    }
}
