//! RSA-OAEP (SHA-256) encryption for the handshake.
//!
//! Only ever used for the one short message that carries the session id and
//! key from server to client, so plaintexts are UTF-8 strings.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::CryptoError;
use crate::pem;

/// Parse a public key from SPKI (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM.
pub fn parse_public_key(public_key_pem: &str) -> Result<RsaPublicKey, CryptoError> {
    let pem = pem::canonicalize(public_key_pem)?;
    match pem.label.as_str() {
        "PUBLIC KEY" => RsaPublicKey::from_public_key_pem(&pem.text)
            .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_pem(&pem.text)
            .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        other => Err(CryptoError::InvalidKey(format!(
            "unexpected PEM label for public key: {other}"
        ))),
    }
}

/// Parse a private key from PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`) PEM.
pub fn parse_private_key(private_key_pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    let pem = pem::canonicalize(private_key_pem)?;
    match pem.label.as_str() {
        "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_pem(&pem.text)
            .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_pem(&pem.text)
            .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        other => Err(CryptoError::InvalidKey(format!(
            "unexpected PEM label for private key: {other}"
        ))),
    }
}

/// Encrypt a UTF-8 string with RSA-OAEP/SHA-256, returning base64.
pub fn encrypt(plaintext: &str, public_key_pem: &str) -> Result<String, CryptoError> {
    let key = parse_public_key(public_key_pem)?;
    encrypt_with(plaintext, &key)
}

/// Encrypt with an already-parsed public key.
pub fn encrypt_with(plaintext: &str, key: &RsaPublicKey) -> Result<String, CryptoError> {
    let ciphertext = key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    Ok(STANDARD.encode(ciphertext))
}

/// Decrypt base64 RSA-OAEP/SHA-256 ciphertext back into a UTF-8 string.
pub fn decrypt(ciphertext: &str, private_key_pem: &str) -> Result<String, CryptoError> {
    let key = parse_private_key(private_key_pem)?;
    decrypt_with(ciphertext, &key)
}

/// Decrypt with an already-parsed private key.
pub fn decrypt_with(ciphertext: &str, key: &RsaPrivateKey) -> Result<String, CryptoError> {
    let raw = STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {e}")))?;
    let plaintext = key
        .decrypt(Oaep::new::<Sha256>(), &raw)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::DecryptionFailed("plaintext is not valid UTF-8".into()))
}
