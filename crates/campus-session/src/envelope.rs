//! Wire shapes exchanged with the Campus API server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;

/// Route the handshake is posted to.
pub const HANDSHAKE_ROUTE: &str = "/handshake";

/// Body of the handshake request.
///
/// Over a secure transport the public key is omitted and the body is `{}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HandshakeRequest {
    /// Base64 of the client's SPKI PEM public key.
    #[serde(rename = "userPublicKey", skip_serializing_if = "Option::is_none")]
    pub user_public_key: Option<String>,
}

/// Session identity issued by the server.
#[derive(Clone, Deserialize)]
pub struct SessionGrant {
    pub id: String,
    pub key: String,
}

impl std::fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGrant")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Body of every post-handshake request.
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    pub session: &'a str,
    /// Either the payload itself (secure transport) or base64 ciphertext of
    /// its JSON (insecure transport).
    pub data: Value,
}

/// Body of every server response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

impl ResponseEnvelope {
    /// Apply the success convention: `success: false` becomes an API error
    /// carrying the server's message.
    pub fn into_result(self) -> Result<Self, SessionError> {
        if self.success {
            Ok(self)
        } else {
            Err(SessionError::Api {
                message: self.msg.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    /// The `data` field, treating JSON `null` as absent.
    pub fn take_data(&mut self) -> Option<Value> {
        self.data.take().filter(|v| !v.is_null())
    }
}
