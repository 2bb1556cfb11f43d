//! Startup: resolve the server, handshake, and hand back a ready dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use campus_core::config::global_config_path;
use campus_core::{Config, ServerTarget};
use campus_session::{
    Dispatcher, ErrorKind, EstablishedSession, Handshake, HttpTransport, SessionContext,
    SessionError,
};

/// Directory holding the persisted server target and credential.
pub fn state_dir() -> Option<PathBuf> {
    global_config_path().and_then(|p| p.parent().map(std::path::Path::to_path_buf))
}

pub fn server_info_path() -> Option<PathBuf> {
    state_dir().map(|d| d.join("server-info.json"))
}

pub fn credential_path() -> Option<PathBuf> {
    state_dir().map(|d| d.join("credential.json"))
}

/// Reconcile the configured server URL with the persisted target.
///
/// A configured URL wins and is written back to the target (which persists
/// it if the owner registered persistence); otherwise the last persisted
/// URL fills in the configuration.
pub fn resolve_server(config: &mut Config, target: &mut ServerTarget) -> anyhow::Result<()> {
    if let Some(url) = config.server.url.as_deref() {
        target.set(url)?;
    } else if let Some(url) = target.url() {
        config.server.url = Some(url.to_string());
    }
    Ok(())
}

/// Human-readable explanation of a startup handshake failure.
pub fn explain_failure(err: &SessionError, config: &Config, target: &ServerTarget) -> String {
    let server = config.server.url.as_deref().unwrap_or("the server");
    let mut message = match err.kind() {
        ErrorKind::Transport if err.is_timeout() => format!(
            "{server} did not answer within {}s. Check your network connection and try again.",
            config.server.handshake_timeout().as_secs()
        ),
        ErrorKind::Transport => format!("Cannot reach {server}: {err}"),
        ErrorKind::Api => format!("{server} refused to open a session: {err}"),
        ErrorKind::Crypto => {
            format!("Could not set up an encrypted session with {server}: {err}")
        }
        ErrorKind::Protocol => format!("{server} sent an unexpected handshake reply: {err}"),
    };
    if matches!(err.kind(), ErrorKind::Transport | ErrorKind::Api) {
        if let Some(status) = target.status_page_url() {
            use std::fmt::Write;
            let _ = write!(message, "\nService status: {status}");
        }
    }
    message
}

/// A connected client: transport, session and dispatcher.
#[derive(Debug)]
pub struct CampusClient {
    pub dispatcher: Dispatcher,
    pub session: Arc<EstablishedSession>,
}

impl CampusClient {
    /// Perform the startup handshake described by `config`.
    pub async fn connect(config: &Config) -> Result<Self, SessionError> {
        let transport = Arc::new(HttpTransport::from_config(&config.server)?);
        let context = Arc::new(SessionContext::new());

        info!(
            server = %transport.base_url(),
            security = ?transport.security(),
            "Connecting"
        );
        let session = Handshake::from_config(&transport, &context, config)
            .run()
            .await
            .inspect_err(|e| warn!(error = %e, "Startup handshake failed"))?;

        Ok(Self {
            dispatcher: Dispatcher::new(transport, context),
            session,
        })
    }

    /// Like [`connect`](Self::connect), with the failure turned into a
    /// user-facing message.
    pub async fn connect_or_explain(config: &Config, target: &ServerTarget) -> anyhow::Result<Self> {
        Self::connect(config)
            .await
            .map_err(|e| anyhow::anyhow!(explain_failure(&e, config, target)))
    }
}
