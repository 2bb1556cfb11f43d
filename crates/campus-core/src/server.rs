//! Server target store.
//!
//! Holds the base URL of the API server. The URL only changes through
//! [`ServerTarget::set`], which synchronously notifies registered listeners
//! with the old and new values. Persistence is just another listener the
//! owner chooses to register via [`ServerTarget::persist_to`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Callback invoked after the server URL changes: `(old, new)`.
pub type ChangeListener = Box<dyn Fn(Option<&Url>, &Url) + Send + Sync>;

/// On-disk form of the server target.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredServerInfo {
    #[serde(rename = "hostURL")]
    host_url: String,
}

/// The API server the session layer talks to.
#[derive(Default)]
pub struct ServerTarget {
    url: Option<Url>,
    listeners: Vec<ChangeListener>,
}

impl std::fmt::Debug for ServerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTarget")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Parse and validate a server base URL (http or https, with a host).
pub fn parse_server_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "{raw}: unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl(format!("{raw}: missing host")));
    }
    Ok(url)
}

impl ServerTarget {
    /// An empty target with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously persisted target. Returns an empty target if the
    /// file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let stored: StoredServerInfo = serde_json::from_str(&data)?;
        let url = if stored.host_url.is_empty() {
            None
        } else {
            Some(parse_server_url(&stored.host_url)?)
        };
        Ok(Self {
            url,
            listeners: Vec::new(),
        })
    }

    /// Current server URL, if one has been set.
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Register a listener invoked after every effective change.
    pub fn on_change(&mut self, listener: impl Fn(Option<&Url>, &Url) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Persist the target to `path` on every change.
    ///
    /// Write failures are logged, not propagated: the in-memory value stays
    /// authoritative.
    pub fn persist_to(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.on_change(move |_old, new| {
            if let Err(e) = save(&path, new) {
                warn!(path = %path.display(), error = %e, "Failed to persist server target");
            }
        });
    }

    /// Replace the server URL and notify listeners.
    ///
    /// Returns `true` if the value changed. Setting the same URL again is a
    /// no-op and does not notify.
    pub fn set(&mut self, raw: &str) -> Result<bool> {
        let new = parse_server_url(raw)?;
        if self.url.as_ref() == Some(&new) {
            return Ok(false);
        }
        let old = self.url.replace(new);
        if let Some(current) = self.url.as_ref() {
            debug!(old = ?old.as_ref().map(Url::as_str), new = %current, "Server target changed");
            for listener in &self.listeners {
                listener(old.as_ref(), current);
            }
        }
        Ok(true)
    }

    /// Status page for the current server: `https://status.<domain>/`, or
    /// `about:blank` for local development.
    pub fn status_page_url(&self) -> Option<String> {
        let domain = self.url.as_ref()?.host_str()?;
        if domain == "localhost" {
            Some("about:blank".to_string())
        } else {
            Some(format!("https://status.{domain}/"))
        }
    }
}

fn save(path: &Path, url: &Url) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let stored = StoredServerInfo {
        host_url: url.as_str().to_string(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&stored)?)?;
    Ok(())
}
