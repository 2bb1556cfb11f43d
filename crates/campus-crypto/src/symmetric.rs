//! AES-256-CBC envelope encryption.
//!
//! Keys travel as a single hex string: 64 hex chars of AES-256 key followed
//! by 32 hex chars of IV. Ciphertext is PKCS#7 padded and base64 encoded.

use aes::Aes256;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// CBC initialisation vector size in bytes (one AES block).
pub const IV_SIZE: usize = 16;

/// Length of the hex-encoded credential (`<key><iv>`).
pub const CREDENTIAL_HEX_LEN: usize = (KEY_SIZE + IV_SIZE) * 2;

const BLOCK_SIZE: usize = 16;

/// An AES-256 key and CBC IV pair.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricCredential {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl std::fmt::Debug for SymmetricCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricCredential")
            .field("key", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .finish()
    }
}

impl SymmetricCredential {
    /// Generate a fresh random key and IV from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut key);
        OsRng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    /// Build a credential from raw key and IV bytes.
    pub const fn from_parts(key: [u8; KEY_SIZE], iv: [u8; IV_SIZE]) -> Self {
        Self { key, iv }
    }

    /// Decode a 96-hex-char credential.
    ///
    /// The first 64 hex chars are always the key and the remaining 32 the IV.
    pub fn parse(encoded: &str) -> Result<Self, CryptoError> {
        if encoded.len() != CREDENTIAL_HEX_LEN {
            return Err(CryptoError::InvalidCredentialLength {
                expected: CREDENTIAL_HEX_LEN,
                actual: encoded.len(),
            });
        }
        if !encoded.is_ascii() {
            return Err(CryptoError::InvalidCredential(
                "credential contains non-ASCII characters".into(),
            ));
        }

        let (key_hex, iv_hex) = encoded.split_at(KEY_SIZE * 2);
        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; IV_SIZE];
        hex::decode_to_slice(key_hex, &mut key)
            .map_err(|e| CryptoError::InvalidCredential(format!("key: {e}")))?;
        hex::decode_to_slice(iv_hex, &mut iv)
            .map_err(|e| CryptoError::InvalidCredential(format!("iv: {e}")))?;
        Ok(Self { key, iv })
    }

    /// Encode as lowercase `<key hex><iv hex>`. Handle with care.
    pub fn to_hex(&self) -> String {
        let mut out = hex::encode(self.key);
        out.push_str(&hex::encode(self.iv));
        out
    }

    pub const fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub const fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }
}

impl std::str::FromStr for SymmetricCredential {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encrypt `plaintext` and return base64 ciphertext.
pub fn encrypt(plaintext: &[u8], credential: &SymmetricCredential) -> Result<String, CryptoError> {
    let cipher = Aes256CbcEnc::new_from_slices(&credential.key, &credential.iv)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    Ok(STANDARD.encode(ciphertext))
}

/// Decrypt base64 `ciphertext` produced by [`encrypt`].
///
/// Fails rather than returning garbage when the input is not valid base64,
/// is not a whole number of blocks, or carries invalid padding.
pub fn decrypt(ciphertext: &str, credential: &SymmetricCredential) -> Result<Vec<u8>, CryptoError> {
    let raw = STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {e}")))?;
    if raw.is_empty() || raw.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::DecryptionFailed(format!(
            "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
            raw.len()
        )));
    }

    let cipher = Aes256CbcDec::new_from_slices(&credential.key, &credential.iv)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&raw)
        .map_err(|_| CryptoError::DecryptionFailed("invalid padding".into()))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f\
                          a0a1a2a3a4a5a6a7a8a9aaabacadaeaf";

    #[test]
    fn generated_credential_is_96_hex_chars() {
        let cred = SymmetricCredential::generate();
        let encoded = cred.to_hex();
        assert_eq!(encoded.len(), CREDENTIAL_HEX_LEN);
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn parse_splits_key_and_iv_at_64_chars() {
        let cred = SymmetricCredential::parse(SAMPLE).unwrap();
        assert_eq!(cred.key().len(), 32);
        assert_eq!(cred.iv().len(), 16);
        assert_eq!(cred.key()[0], 0x00);
        assert_eq!(cred.key()[31], 0x1f);
        assert_eq!(cred.iv()[0], 0xa0);
        assert_eq!(cred.iv()[15], 0xaf);
    }

    #[test]
    fn parse_is_deterministic_and_round_trips() {
        let a = SymmetricCredential::parse(SAMPLE).unwrap();
        let b: SymmetricCredential = SAMPLE.parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), SAMPLE);
    }

    #[test]
    fn parse_accepts_uppercase_hex() {
        let upper = SAMPLE.to_uppercase();
        let cred = SymmetricCredential::parse(&upper).unwrap();
        assert_eq!(cred.to_hex(), SAMPLE);
    }

    #[test]
    fn parse_rejects_other_lengths() {
        for len in [0, 32, 64, 95, 97, 128] {
            let s = "a".repeat(len);
            let result = SymmetricCredential::parse(&s);
            assert!(
                matches!(
                    result,
                    Err(CryptoError::InvalidCredentialLength { expected: 96, actual }) if actual == len
                ),
                "length {len} should be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_non_hex() {
        let bad = format!("{}zz", &SAMPLE[..94]);
        assert!(matches!(
            SymmetricCredential::parse(&bad),
            Err(CryptoError::InvalidCredential(_))
        ));
    }

    #[test]
    fn parse_rejects_multibyte_input_of_matching_byte_length() {
        // 94 ASCII bytes + one 2-byte char = 96 bytes.
        let bad = format!("{}é", &SAMPLE[..94]);
        assert_eq!(bad.len(), 96);
        assert!(matches!(
            SymmetricCredential::parse(&bad),
            Err(CryptoError::InvalidCredential(_))
        ));
    }

    #[test]
    fn debug_redacts_material() {
        let cred = SymmetricCredential::parse(SAMPLE).unwrap();
        let dbg = format!("{cred:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("0a0b0c"));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cred = SymmetricCredential::generate();
        let plaintext = b"{\"id\":\"s-001\",\"name\":\"Ada\"}";
        let ct = encrypt(plaintext, &cred).unwrap();
        assert_eq!(decrypt(&ct, &cred).unwrap(), plaintext);
    }

    #[test]
    fn roundtrip_across_lengths_and_credentials() {
        for _ in 0..8 {
            let cred = SymmetricCredential::generate();
            for len in [0usize, 1, 15, 16, 17, 31, 32, 33, 255, 4096] {
                let plaintext: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
                let ct = encrypt(&plaintext, &cred).unwrap();
                assert_eq!(decrypt(&ct, &cred).unwrap(), plaintext, "len {len}");
            }
        }
    }

    #[test]
    fn ciphertext_is_padded_to_block_multiple() {
        let cred = SymmetricCredential::generate();
        let ct = encrypt(b"exactly sixteen!", &cred).unwrap();
        let raw = STANDARD.decode(ct).unwrap();
        // A full block of padding is appended to block-aligned input.
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn decrypt_rejects_non_block_multiple() {
        let cred = SymmetricCredential::generate();
        let ct = STANDARD.encode([0u8; 17]);
        assert!(matches!(
            decrypt(&ct, &cred),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn decrypt_rejects_empty_ciphertext() {
        let cred = SymmetricCredential::generate();
        assert!(matches!(
            decrypt("", &cred),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn decrypt_rejects_invalid_base64() {
        let cred = SymmetricCredential::generate();
        assert!(matches!(
            decrypt("not base64!!", &cred),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn decrypt_with_wrong_credential_fails_or_differs() {
        let cred = SymmetricCredential::generate();
        let other = SymmetricCredential::generate();
        let ct = encrypt(b"secret roster", &cred).unwrap();
        // CBC has no authentication: a wrong key usually breaks padding, but
        // when it happens to yield valid padding the plaintext must differ.
        match decrypt(&ct, &other) {
            Err(CryptoError::DecryptionFailed(_)) => {}
            Ok(pt) => assert_ne!(pt, b"secret roster"),
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    fn decrypt_rejects_corrupted_padding() {
        let cred = SymmetricCredential::parse(SAMPLE).unwrap();
        let ct = encrypt(b"abc", &cred).unwrap();
        let mut raw = STANDARD.decode(ct).unwrap();
        // Flipping a ciphertext byte scrambles the whole (only) block.
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let result = decrypt(&STANDARD.encode(&raw), &cred);
        match result {
            Err(CryptoError::DecryptionFailed(_)) => {}
            Ok(pt) => assert_ne!(pt, b"abc"),
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    fn same_credential_same_plaintext_is_deterministic() {
        let cred = SymmetricCredential::generate();
        let a = encrypt(b"repeat", &cred).unwrap();
        let b = encrypt(b"repeat", &cred).unwrap();
        assert_eq!(a, b);
    }
}
