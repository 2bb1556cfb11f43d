//! Session handshake.
//!
//! Drives `Idle -> KeysGenerated -> AwaitingServer -> Established`, or into
//! `Failed` from any step. On an insecure transport the client sends a fresh
//! RSA public key and the server answers with the session identity encrypted
//! to it; on a secure transport the body is empty and the identity comes back
//! in the clear. The established session is published to the shared
//! [`SessionContext`] only after every step has succeeded.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use campus_core::Config;
use campus_crypto::{SessionKeyDerivation, asymmetric, generate_key_pair};

use crate::envelope::{HANDSHAKE_ROUTE, HandshakeRequest, SessionGrant};
use crate::error::{ErrorKind, SessionError};
use crate::http::HttpTransport;
use crate::state::{EstablishedSession, SessionContext};

/// Default bound on the server exchange.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a handshake attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakePhase {
    Idle,
    KeysGenerated,
    AwaitingServer,
    Established,
    Failed { kind: ErrorKind, reason: String },
}

impl std::fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::KeysGenerated => write!(f, "keys generated"),
            Self::AwaitingServer => write!(f, "awaiting server"),
            Self::Established => write!(f, "established"),
            Self::Failed { reason, .. } => write!(f, "failed: {reason}"),
        }
    }
}

/// A single handshake attempt. Run it once; start a new one to re-handshake.
#[derive(Debug)]
pub struct Handshake<'a> {
    transport: &'a HttpTransport,
    context: &'a SessionContext,
    derivation: SessionKeyDerivation,
    timeout: Duration,
    phase: HandshakePhase,
}

impl<'a> Handshake<'a> {
    pub const fn new(transport: &'a HttpTransport, context: &'a SessionContext) -> Self {
        Self {
            transport,
            context,
            derivation: SessionKeyDerivation::Direct,
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            phase: HandshakePhase::Idle,
        }
    }

    /// Handshake using the timeout and key derivation from `config`.
    pub fn from_config(
        transport: &'a HttpTransport,
        context: &'a SessionContext,
        config: &Config,
    ) -> Self {
        Self::new(transport, context)
            .with_timeout(config.server.handshake_timeout())
            .with_key_derivation(config.session.key_derivation)
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_key_derivation(mut self, derivation: SessionKeyDerivation) -> Self {
        self.derivation = derivation;
        self
    }

    pub const fn phase(&self) -> &HandshakePhase {
        &self.phase
    }

    /// Perform the handshake and publish the session.
    ///
    /// On failure the phase ends in `Failed` and the context is untouched.
    #[instrument(skip(self), fields(server = %self.transport.base_url()))]
    pub async fn run(&mut self) -> Result<Arc<EstablishedSession>, SessionError> {
        if self.phase != HandshakePhase::Idle {
            return Err(SessionError::Protocol(format!(
                "handshake already attempted ({})",
                self.phase
            )));
        }

        match self.exchange().await {
            Ok(grant) => {
                self.transition(HandshakePhase::Established);
                Ok(grant)
            }
            Err(e) => {
                warn!(error = %e, "Handshake failed");
                self.transition(HandshakePhase::Failed {
                    kind: e.kind(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn exchange(&mut self) -> Result<Arc<EstablishedSession>, SessionError> {
        let key_pair = generate_key_pair().await?;
        self.transition(HandshakePhase::KeysGenerated);

        let secure = self.transport.security().is_secure();
        let request = HandshakeRequest {
            user_public_key: (!secure).then(|| STANDARD.encode(key_pair.public_key_pem())),
        };

        self.transition(HandshakePhase::AwaitingServer);
        let mut envelope = self
            .transport
            .post_envelope(HANDSHAKE_ROUTE, &request, self.timeout)
            .await?;

        let api_version = envelope.api_version.take().unwrap_or_else(|| {
            warn!("Handshake response has no api_version");
            String::new()
        });
        let data = envelope
            .take_data()
            .ok_or_else(|| SessionError::Protocol("handshake response has no data".into()))?;

        let grant: SessionGrant = if secure {
            serde_json::from_value(data)
                .map_err(|e| SessionError::Protocol(format!("malformed session grant: {e}")))?
        } else {
            let Value::String(ciphertext) = data else {
                return Err(SessionError::Protocol(
                    "expected encrypted session grant".into(),
                ));
            };
            let plaintext = asymmetric::decrypt(&ciphertext, key_pair.private_key_pem())?;
            serde_json::from_str(&plaintext)
                .map_err(|e| SessionError::Protocol(format!("malformed session grant: {e}")))?
        };
        drop(key_pair);

        if grant.id.is_empty() || grant.key.is_empty() {
            return Err(SessionError::Protocol(
                "session grant has an empty id or key".into(),
            ));
        }

        // The key only seals payloads when the transport does not.
        let credential = if secure {
            None
        } else {
            Some(
                self.derivation
                    .credential_for(&grant.key)
                    .map_err(|e| SessionError::Protocol(format!("unusable session key: {e}")))?,
            )
        };

        info!(session_id = %grant.id, %api_version, secure, "Handshake complete");
        Ok(self
            .context
            .publish(grant.id, grant.key, api_version, credential)
            .await)
    }

    fn transition(&mut self, next: HandshakePhase) {
        debug!(from = %self.phase, to = %next, "Handshake phase");
        self.phase = next;
    }
}
