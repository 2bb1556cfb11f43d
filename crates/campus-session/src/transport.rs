//! Transport security detection.
//!
//! Decides whether the connection to the server is already confidential.
//! When it is, the handshake skips sending a public key and RPC payloads are
//! sent in the clear; when it is not, the session layer encrypts everything
//! itself.

use campus_core::SecurityMode;
use url::Url;

/// Host alias treated as a trusted local development loopback.
pub const LOOPBACK_ALIAS: &str = "localhost";

/// Whether the transport to the server provides confidentiality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSecurity {
    Secure,
    Insecure,
}

/// `true` for `https` origins and for the `localhost` development alias.
pub fn is_secure(origin: &Url) -> bool {
    origin.scheme() == "https" || origin.host_str() == Some(LOOPBACK_ALIAS)
}

impl TransportSecurity {
    /// Classify an origin.
    pub fn detect(origin: &Url) -> Self {
        if is_secure(origin) {
            Self::Secure
        } else {
            Self::Insecure
        }
    }

    /// Apply a configured override, falling back to detection for `Auto`.
    pub fn resolve(mode: SecurityMode, origin: &Url) -> Self {
        match mode {
            SecurityMode::Auto => Self::detect(origin),
            SecurityMode::Secure => Self::Secure,
            SecurityMode::Insecure => Self::Insecure,
        }
    }

    pub const fn is_secure(self) -> bool {
        matches!(self, Self::Secure)
    }
}
