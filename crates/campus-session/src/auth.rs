//! Sign-in over an established session.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::dispatcher::Dispatcher;
use crate::error::SessionError;

pub const SIGN_IN_ROUTE: &str = "/sign-in";
pub const TOKEN_STATE_ROUTE: &str = "/get-token-state";

/// A signed-in user's token, persisted between runs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub token: String,
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl SessionCredential {
    /// Load a stored credential. Missing file or empty token means none.
    pub fn load(path: &Path) -> campus_core::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        let credential: Self = serde_json::from_str(&data)?;
        Ok((!credential.token.is_empty()).then_some(credential))
    }

    pub fn save(&self, path: &Path) -> campus_core::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Remove a stored credential; absent file is not an error.
    pub fn clear(path: &Path) -> campus_core::Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    #[error("Incorrect user name or password")]
    InvalidCredentials,

    #[error("Unknown error: {0}")]
    Unavailable(String),
}

impl From<SessionError> for SignInError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Api { .. } => Self::InvalidCredentials,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    id: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    token: String,
}

#[derive(Serialize)]
struct TokenStateRequest<'a> {
    #[serde(rename = "tokenToCheck")]
    token_to_check: &'a str,
    #[serde(rename = "userID")]
    user_id: &'a str,
}

#[derive(Deserialize)]
struct TokenStateResponse {
    valid: bool,
}

/// Exchange a user id and password for a token.
#[instrument(skip(dispatcher, password))]
pub async fn sign_in(
    dispatcher: &Dispatcher,
    user_id: &str,
    password: &str,
) -> Result<SessionCredential, SignInError> {
    let resp: SignInResponse = dispatcher
        .call(SIGN_IN_ROUTE, &SignInRequest { id: user_id, password })
        .await?;
    info!(user_id, "Signed in");
    Ok(SessionCredential {
        user_id: user_id.to_string(),
        token: resp.token,
    })
}

/// Ask the server whether a stored token is still valid.
pub async fn check_token(
    dispatcher: &Dispatcher,
    credential: &SessionCredential,
) -> Result<bool, SessionError> {
    let resp: TokenStateResponse = dispatcher
        .call(
            TOKEN_STATE_ROUTE,
            &TokenStateRequest {
                token_to_check: &credential.token,
                user_id: &credential.user_id,
            },
        )
        .await?;
    Ok(resp.valid)
}
