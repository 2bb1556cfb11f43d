//! Shared session context.
//!
//! One [`SessionContext`] is shared between the handshake that writes it and
//! the dispatchers that read it. Publication is atomic: readers see either
//! the previous session or the complete new one, never a mix. Each
//! publication bumps a generation counter so in-flight calls can tell when
//! the session they started with has been replaced.

use std::sync::Arc;

use campus_crypto::SymmetricCredential;
use tokio::sync::RwLock;
use tracing::info;
use zeroize::Zeroizing;

/// A fully established session, immutable once published.
pub struct EstablishedSession {
    session_id: String,
    session_key: Zeroizing<String>,
    api_version: String,
    credential: Option<SymmetricCredential>,
    generation: u64,
}

impl EstablishedSession {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Credential used to seal and open payloads. `None` when the session
    /// was opened over a secure transport, where payloads travel in the clear.
    pub const fn credential(&self) -> Option<&SymmetricCredential> {
        self.credential.as_ref()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for EstablishedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstablishedSession")
            .field("session_id", &self.session_id)
            .field("api_version", &self.api_version)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of the session, as callers see it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub session_id: String,
    pub session_key: String,
    pub api_version: String,
    pub established: bool,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("session_id", &self.session_id)
            .field("api_version", &self.api_version)
            .field("established", &self.established)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Slot {
    generation: u64,
    current: Option<Arc<EstablishedSession>>,
}

/// Holder of the current session, shared via `Arc`.
#[derive(Default)]
pub struct SessionContext {
    slot: RwLock<Slot>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current session, if any.
    pub async fn current(&self) -> Option<Arc<EstablishedSession>> {
        self.slot.read().await.current.clone()
    }

    pub async fn is_established(&self) -> bool {
        self.slot.read().await.current.is_some()
    }

    /// Snapshot of the session fields. Empty strings until established.
    pub async fn state(&self) -> SessionState {
        self.current()
            .await
            .map_or_else(SessionState::default, |s| SessionState {
                session_id: s.session_id.clone(),
                session_key: String::clone(&s.session_key),
                api_version: s.api_version.clone(),
                established: true,
            })
    }

    /// Whether `session` is still the one published.
    pub async fn is_current(&self, session: &EstablishedSession) -> bool {
        self.slot.read().await.generation == session.generation
    }

    /// Replace the current session with a new one. Used by the handshake.
    pub(crate) async fn publish(
        &self,
        session_id: String,
        session_key: String,
        api_version: String,
        credential: Option<SymmetricCredential>,
    ) -> Arc<EstablishedSession> {
        let mut slot = self.slot.write().await;
        slot.generation += 1;
        let session = Arc::new(EstablishedSession {
            session_id,
            session_key: Zeroizing::new(session_key),
            api_version,
            credential,
            generation: slot.generation,
        });
        slot.current = Some(Arc::clone(&session));
        info!(
            session_id = %session.session_id,
            api_version = %session.api_version,
            generation = session.generation,
            "Session established"
        );
        session
    }

    /// Drop the current session. In-flight calls made with it will fail.
    pub async fn clear(&self) {
        let mut slot = self.slot.write().await;
        slot.generation += 1;
        if slot.current.take().is_some() {
            info!("Session cleared");
        }
    }
}
