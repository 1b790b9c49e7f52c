//! Conversation identifiers and transport-scoped session keys.

use std::fmt;

use crate::error::GatewayError;

/// Maximum length of a conversation identifier.
pub const MAX_CONVERSATION_ID_LEN: usize = 64;

/// Validated conversation identifier (`[A-Za-z0-9_-]{1,64}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    /// Identifier used when the client supplies none.
    pub const DEFAULT: &'static str = "default";

    /// Validate a client-supplied identifier. `None` and `""` resolve to `"default"`.
    pub fn parse(raw: Option<&str>) -> Result<Self, GatewayError> {
        let raw = match raw {
            None | Some("") => return Ok(Self(Self::DEFAULT.to_string())),
            Some(raw) => raw,
        };

        if raw.len() > MAX_CONVERSATION_ID_LEN || !raw.bytes().all(is_id_byte) {
            return Err(GatewayError::InvalidSessionId);
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Canonical key for per-session serialization: `<channel>:<conversation_id>`.
///
/// The channel prefix keeps different front doors from colliding on the same
/// conversation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn scoped(channel: &str, conversation_id: &ConversationId) -> Self {
        Self(format!("{}:{}", channel, conversation_id))
    }

    /// Validate `raw` and scope it to `channel` in one step.
    pub fn new(channel: &str, raw: Option<&str>) -> Result<Self, GatewayError> {
        Ok(Self::scoped(channel, &ConversationId::parse(raw)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
