//! Raw JSON-over-HTTP transport to the Campus API server.
//!
//! Every request is a `POST` with a JSON body. Responses are parsed as a
//! [`ResponseEnvelope`] and the `success` convention is applied before the
//! caller sees them. Nothing here encrypts; that is the dispatcher's job.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use campus_core::config::ServerConfig;
use campus_core::server::parse_server_url;

use crate::envelope::ResponseEnvelope;
use crate::error::SessionError;
use crate::transport::TransportSecurity;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one server origin.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    security: TransportSecurity,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for `base_url` with security detected from the URL.
    pub fn new(base_url: Url) -> Result<Self, SessionError> {
        let security = TransportSecurity::detect(&base_url);
        Self::with_security(base_url, security)
    }

    /// Create a transport with an explicit security classification.
    pub fn with_security(base_url: Url, security: TransportSecurity) -> Result<Self, SessionError> {
        // reqwest is built with rustls-no-provider; an Err here only means a
        // provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SessionError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            security,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Build from the `[server]` section of the configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, SessionError> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| SessionError::Config("server URL is not set".into()))?;
        let base_url = parse_server_url(raw)?;
        let security = TransportSecurity::resolve(config.security, &base_url);
        Ok(Self::with_security(base_url, security)?.with_request_timeout(config.request_timeout()))
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub const fn security(&self) -> TransportSecurity {
        self.security
    }

    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Absolute URL for a route such as `/get-student-by-id`.
    pub(crate) fn endpoint(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }

    /// Post `body` to `route` and return the response envelope.
    ///
    /// `success: false` is reported as [`SessionError::Api`], even when it
    /// arrives with a non-2xx status.
    pub async fn post_envelope<B: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<ResponseEnvelope, SessionError> {
        let url = self.endpoint(route);
        debug!(%url, ?timeout, "POST");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        match serde_json::from_slice::<ResponseEnvelope>(&bytes) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(SessionError::Transport {
                message: format!(
                    "{url}: HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
                timed_out: false,
            }),
            Err(e) => Err(SessionError::Protocol(format!(
                "malformed response from {url}: {e}"
            ))),
        }
    }

    /// Unauthenticated post for pre-session endpoints.
    ///
    /// No encryption is applied. The response `data` is decoded into `Resp`;
    /// a missing `data` field decodes as JSON `null`.
    pub async fn post<Req, Resp>(&self, route: &str, payload: &Req) -> Result<Resp, SessionError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut envelope = self
            .post_envelope(route, payload, self.request_timeout)
            .await?;
        let data = envelope.take_data().unwrap_or_default();
        serde_json::from_value(data)
            .map_err(|e| SessionError::Protocol(format!("unexpected response data: {e}")))
    }
}
