//! Post-handshake RPC dispatch.
//!
//! Wraps every call in the `{session, data}` envelope. Over an insecure
//! transport `data` is the base64 AES-256-CBC ciphertext of the payload's
//! JSON and the response `data` is decrypted the same way; over a secure
//! transport both travel as plain JSON.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use campus_crypto::symmetric;

use crate::envelope::RequestEnvelope;
use crate::error::SessionError;
use crate::http::HttpTransport;
use crate::state::SessionContext;

/// Sends authenticated calls using the current session.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    transport: Arc<HttpTransport>,
    context: Arc<SessionContext>,
}

impl Dispatcher {
    pub const fn new(transport: Arc<HttpTransport>, context: Arc<SessionContext>) -> Self {
        Self { transport, context }
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Call `route` with `payload` and decode the response data.
    ///
    /// Fails with [`SessionError::SessionSuperseded`] if the session was
    /// replaced or cleared while the call was in flight; the late response
    /// is discarded.
    #[instrument(skip(self, payload))]
    pub async fn call<Req, Resp>(&self, route: &str, payload: &Req) -> Result<Resp, SessionError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let session = self
            .context
            .current()
            .await
            .ok_or(SessionError::NotEstablished)?;
        let secure = self.transport.security().is_secure();

        let credential = if secure {
            None
        } else {
            Some(session.credential().ok_or_else(|| {
                SessionError::Protocol("session has no payload credential".into())
            })?)
        };

        let data = match credential {
            None => serde_json::to_value(payload).map_err(encode_error)?,
            Some(credential) => {
                let json = serde_json::to_vec(payload).map_err(encode_error)?;
                Value::String(symmetric::encrypt(&json, credential)?)
            }
        };

        let body = RequestEnvelope {
            session: session.session_id(),
            data,
        };
        let mut envelope = self
            .transport
            .post_envelope(route, &body, self.transport.request_timeout())
            .await?;
        if !self.context.is_current(&session).await {
            debug!(session_id = session.session_id(), "Discarding response for superseded session");
            return Err(SessionError::SessionSuperseded);
        }

        let data = envelope.take_data().ok_or(SessionError::EmptyData)?;

        let value = match credential {
            None => data,
            Some(credential) => {
                let Value::String(ciphertext) = data else {
                    return Err(SessionError::Decrypt("response data is not ciphertext".into()));
                };
                let plaintext = symmetric::decrypt(&ciphertext, credential)
                    .map_err(|e| SessionError::Decrypt(e.to_string()))?;
                serde_json::from_slice::<Value>(&plaintext)
                    .map_err(|e| SessionError::Decrypt(e.to_string()))?
            }
        };
        if value.is_null() {
            return Err(SessionError::EmptyData);
        }

        serde_json::from_value(value)
            .map_err(|e| SessionError::Protocol(format!("unexpected response data: {e}")))
    }
}

fn encode_error(e: serde_json::Error) -> SessionError {
    SessionError::Protocol(format!("failed to encode payload: {e}"))
}
