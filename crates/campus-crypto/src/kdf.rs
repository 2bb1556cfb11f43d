//! Session-key to envelope-credential derivation.
//!
//! The server issues the session key as an opaque string. Historically that
//! string *is* a 96-hex-char credential and is used as-is; servers that issue
//! keys of any other shape must use the HKDF convention instead. The choice is
//! explicit configuration, never inferred from the key's length.

use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::symmetric::{IV_SIZE, KEY_SIZE, SymmetricCredential};

/// HKDF salt for domain separation (recommended by RFC 5869).
const HKDF_SALT: &[u8] = b"campus-session-salt-v1";

/// HKDF info string for credential derivation.
const HKDF_INFO: &[u8] = b"campus-session-credential-v1";

/// How the server-issued session key becomes an AES credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKeyDerivation {
    /// The session key must itself be a well-formed 96-hex-char credential.
    #[default]
    Direct,
    /// HKDF-SHA256 over the raw session key bytes, expanded to key || IV.
    Hkdf,
}

impl SessionKeyDerivation {
    /// Turn a server-issued session key into the envelope credential.
    pub fn credential_for(self, session_key: &str) -> Result<SymmetricCredential, CryptoError> {
        match self {
            Self::Direct => SymmetricCredential::parse(session_key),
            Self::Hkdf => hkdf_credential(session_key.as_bytes()),
        }
    }
}

impl std::str::FromStr for SessionKeyDerivation {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "hkdf" => Ok(Self::Hkdf),
            other => Err(CryptoError::KeyDerivationFailed(format!(
                "unknown derivation mode: {other}"
            ))),
        }
    }
}

/// Derive a credential from arbitrary secret bytes via HKDF-SHA256.
pub fn hkdf_credential(secret: &[u8]) -> Result<SymmetricCredential, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::KeyDerivationFailed("empty session key".into()));
    }
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret);
    let mut okm = [0u8; KEY_SIZE + IV_SIZE];
    hk.expand(HKDF_INFO, &mut okm)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    let mut key = [0u8; KEY_SIZE];
    let mut iv = [0u8; IV_SIZE];
    key.copy_from_slice(&okm[..KEY_SIZE]);
    iv.copy_from_slice(&okm[KEY_SIZE..]);
    okm.zeroize();

    let credential = SymmetricCredential::from_parts(key, iv);
    key.zeroize();
    iv.zeroize();
    Ok(credential)
}
