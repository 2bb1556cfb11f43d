//! Campus secure-session cryptography
//!
//! Primitives used by the session layer to bootstrap and use a symmetric
//! session key over a transport that may or may not be confidential.
//!
//! ## Crypto primitives
//!
//! - **Handshake**: ephemeral RSA-2048 keypair per attempt, RSA-OAEP/SHA-256
//! - **Envelope**: AES-256-CBC with PKCS#7 padding, key and IV carried as a
//!   96-hex-char credential
//! - **Derivation**: optional HKDF-SHA256 from an arbitrary server-issued key

pub mod asymmetric;
pub mod error;
pub mod kdf;
pub mod keypair;
mod pem;
pub mod symmetric;

pub use error::CryptoError;
pub use kdf::SessionKeyDerivation;
pub use keypair::{KeyPair, generate_key_pair};
pub use symmetric::{CREDENTIAL_HEX_LEN, SymmetricCredential};
