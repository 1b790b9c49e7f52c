//! Request validation: chat payload decoding and identifier checks.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::gateway::{ConversationId, SessionKey};

/// Wire shape of an inbound chat request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Wire shape of a successful chat response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedChat {
    pub message: String,
    pub conversation_id: ConversationId,
    pub session_key: SessionKey,
}

/// Decodes and checks chat payloads.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    channel: String,
    max_body_bytes: usize,
}

impl RequestValidator {
    pub fn new(channel: impl Into<String>, max_body_bytes: usize) -> Self {
        Self {
            channel: channel.into(),
            max_body_bytes,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Decode `body` into a message and a transport-scoped session key.
    pub fn validate(&self, body: &[u8]) -> Result<ValidatedChat, GatewayError> {
        if body.len() > self.max_body_bytes {
            return Err(GatewayError::MalformedInput("request body too large"));
        }

        let request: ChatRequest = serde_json::from_slice(body)
            .map_err(|_| GatewayError::MalformedInput("invalid request body"))?;

        if request.message.is_empty() {
            return Err(GatewayError::MalformedInput("message is required"));
        }

        let conversation_id = ConversationId::parse(request.conversation_id.as_deref())?;
        let session_key = SessionKey::scoped(&self.channel, &conversation_id);

        Ok(ValidatedChat {
            message: request.message,
            conversation_id,
            session_key,
        })
    }
}
