//! Configuration resolution for Campus.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/campus/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (applied by the binary, highest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use campus_crypto::SessionKeyDerivation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Shortest handshake timeout accepted, in seconds.
pub const MIN_HANDSHAKE_TIMEOUT_SECS: u64 = 5;

/// Longest handshake timeout accepted, in seconds.
pub const MAX_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Shortest per-request timeout accepted, in seconds.
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 1;

/// Complete Campus configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Whether application-layer encryption is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// Decide from the server URL (https or localhost means secure).
    #[default]
    Auto,
    /// Trust the transport; send payloads in the clear.
    Secure,
    /// Always encrypt at the application layer.
    Insecure,
}

impl std::str::FromStr for SecurityMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "secure" => Ok(Self::Secure),
            "insecure" => Ok(Self::Insecure),
            other => Err(Error::Config(format!("unknown security mode: {other}"))),
        }
    }
}

/// Server connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the Campus API server.
    pub url: Option<String>,
    pub security: SecurityMode,
    pub handshake_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            security: SecurityMode::Auto,
            handshake_timeout_secs: MAX_HANDSHAKE_TIMEOUT_SECS,
            request_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Handshake timeout, clamped to the 5-10 second window.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(
            self.handshake_timeout_secs
                .clamp(MIN_HANDSHAKE_TIMEOUT_SECS, MAX_HANDSHAKE_TIMEOUT_SECS),
        )
    }

    /// Per-request timeout, never below one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(MIN_REQUEST_TIMEOUT_SECS))
    }
}

/// Session establishment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub key_derivation: SessionKeyDerivation,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// An explicit `config_file` must exist; the global file is optional. Files
/// are layered key by key, so a later file only overrides the settings it
/// actually names.
pub fn load_config(config_file: Option<&Path>) -> Result<Config> {
    let mut layered = Value::Object(serde_json::Map::new());

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            merge_layer(&mut layered, load_config_file(&global_path)?);
        }
    }

    if let Some(path) = config_file {
        merge_layer(&mut layered, load_config_file(path)?);
    }

    let mut config = into_config(layered)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|p| p.join("campus").join("settings.json"))
}

/// Read one config file as a raw layer, checked against the `Config` shape.
fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let layer: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    Config::deserialize(&layer).map_err(|e| {
        Error::Config(format!("Invalid config file {}: {}", path.display(), e))
    })?;
    Ok(layer)
}

/// Overlay `layer` onto `base`, recursing into objects. Keys absent from
/// `layer` keep their value from `base`.
fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_layer(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn into_config(layered: Value) -> Result<Config> {
    serde_json::from_value(layered).map_err(|e| Error::Config(format!("Invalid config: {e}")))
}

fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("CAMPUS_SERVER_URL") {
        config.server.url = Some(val);
    }
    if let Some(val) = lookup("CAMPUS_SECURITY") {
        config.server.security = val.parse()?;
    }
    if let Some(val) = lookup("CAMPUS_HANDSHAKE_TIMEOUT") {
        if let Ok(n) = val.parse() {
            config.server.handshake_timeout_secs = n;
        }
    }
    if let Some(val) = lookup("CAMPUS_KEY_DERIVATION") {
        config.session.key_derivation = val
            .parse()
            .map_err(|e: campus_crypto::CryptoError| Error::Config(e.to_string()))?;
    }
    if let Some(val) = lookup("CAMPUS_LOG_LEVEL") {
        config.log.level = val;
    }
    Ok(())
}
