//! Session layer error types.

use campus_crypto::CryptoError;

/// Broad failure category, for callers that branch on *kind* of failure
/// rather than on the specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server unreachable or too slow.
    Transport,
    /// Server reachable but the exchange did not follow the protocol, or the
    /// session layer was used out of order.
    Protocol,
    /// Key generation, encryption or decryption failed.
    Crypto,
    /// Server explicitly rejected the request (`success: false`).
    Api,
}

/// Errors from the handshake, the raw transport and the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Fail to post: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("API call failed: {message}")]
    Api { message: String },

    #[error("Fail to decrypt data: {0}")]
    Decrypt(String),

    #[error("Empty data in response")]
    EmptyData,

    #[error("Session not established")]
    NotEstablished,

    #[error("Session was re-established while the call was in flight")]
    SessionSuperseded,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Crypto(_) | Self::Decrypt(_) => ErrorKind::Crypto,
            Self::Api { .. } => ErrorKind::Api,
            Self::Protocol(_)
            | Self::EmptyData
            | Self::NotEstablished
            | Self::SessionSuperseded
            | Self::Config(_) => ErrorKind::Protocol,
        }
    }

    /// Whether the request did not complete within its timeout.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { timed_out: true, .. })
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        }
    }
}

impl From<campus_core::Error> for SessionError {
    fn from(e: campus_core::Error) -> Self {
        Self::Config(e.to_string())
    }
}
