//! Reversible password protection for profile records
//!
//! Passwords are sealed with ChaCha20-Poly1305 under a key derived from an
//! application passphrase, then wrapped in a marker so a stored value can be
//! told apart from a legacy plaintext password on sight:
//!
//! ```text
//! ENC(<base64(nonce || ciphertext || tag)>)
//! ```
//!
//! This protects passwords against casual disclosure (a record shown on screen,
//! pasted into a bug report, synced to a backup). It is not a secrets manager:
//! the key material ships with the application.

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

use crate::error::{ProfileError, Result};

/// Opening marker of an encrypted value
pub const MARKER_PREFIX: &str = "ENC(";
/// Closing marker of an encrypted value
pub const MARKER_SUFFIX: &str = ")";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_CONTEXT: &[u8] = b"sieve-profiles/v1";
const DEFAULT_PASSPHRASE: &str = "sieve-profiles default profile password key";

/// Reasons a stored token could not be turned back into a password
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("value is not wrapped in ENC(...)")]
    NotEncrypted,
    #[error("base64 decoding failed: {0}")]
    Base64(String),
    #[error("payload too short ({0} bytes)")]
    Truncated(usize),
    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,
    #[error("decrypted password is not valid UTF-8")]
    Utf8,
}

/// Symmetric codec for the password field
#[derive(Clone)]
pub struct SecretCodec {
    key: [u8; KEY_LEN],
}

impl SecretCodec {
    /// Derive the codec key from a passphrase
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_CONTEXT);
        hasher.update(passphrase.as_bytes());
        Self {
            key: hasher.finalize().into(),
        }
    }

    /// Check whether a stored value carries the ciphertext marker
    pub fn is_encrypted(value: &str) -> bool {
        let value = value.trim();
        value.len() >= MARKER_PREFIX.len() + MARKER_SUFFIX.len()
            && value.starts_with(MARKER_PREFIX)
            && value.ends_with(MARKER_SUFFIX)
    }

    /// Encrypt a password into a marker-wrapped token
    ///
    /// The empty password is passed through unchanged.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| ProfileError::Encryption(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(format!("{}{}{}", MARKER_PREFIX, STANDARD.encode(blob), MARKER_SUFFIX))
    }

    /// Decrypt a marker-wrapped token, reporting why it failed
    pub fn try_decrypt(&self, token: &str) -> std::result::Result<String, CodecError> {
        let token = token.trim();
        if !Self::is_encrypted(token) {
            return Err(CodecError::NotEncrypted);
        }
        let payload = &token[MARKER_PREFIX.len()..token.len() - MARKER_SUFFIX.len()];

        let blob = STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| CodecError::Base64(e.to_string()))?;
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(CodecError::Truncated(blob.len()));
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CodecError::Authentication)?;

        match String::from_utf8(plaintext) {
            Ok(password) => Ok(password),
            Err(e) => {
                e.into_bytes().zeroize();
                Err(CodecError::Utf8)
            }
        }
    }

    /// Decrypt a token, yielding an empty string on any failure
    ///
    /// Callers must read the empty string as "unavailable", not as an
    /// intentionally blank password.
    pub fn decrypt(&self, token: &str) -> String {
        self.try_decrypt(token).unwrap_or_default()
    }
}

impl Default for SecretCodec {
    fn default() -> Self {
        Self::from_passphrase(DEFAULT_PASSPHRASE)
    }
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec").field("key", &"<redacted>").finish()
    }
}

impl Drop for SecretCodec {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let codec = SecretCodec::default();
        let token = codec.encrypt("mysecretpassword").unwrap();
        assert_eq!(codec.try_decrypt(&token).unwrap(), "mysecretpassword");
    }

    #[test]
    fn test_round_trip_unicode_and_long() {
        let codec = SecretCodec::default();
        let long = "a".repeat(512);
        for password in ["пароль密码🔒", "p@ssw0rd!#$%^&*()", long.as_str()] {
            let token = codec.encrypt(password).unwrap();
            assert_eq!(codec.decrypt(&token), password);
        }
    }

    #[test]
    fn test_token_is_wrapped_and_opaque() {
        let codec = SecretCodec::default();
        let token = codec.encrypt("plaintextpassword").unwrap();

        assert!(token.starts_with("ENC("));
        assert!(token.ends_with(')'));
        assert!(!token.contains("plaintextpassword"));
        assert!(SecretCodec::is_encrypted(&token));
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let codec = SecretCodec::default();
        let first = codec.encrypt("same").unwrap();
        let second = codec.encrypt("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_passes_through() {
        let codec = SecretCodec::default();
        assert_eq!(codec.encrypt("").unwrap(), "");
        assert_eq!(codec.decrypt(""), "");
    }

    #[test]
    fn test_plaintext_is_not_encrypted() {
        let codec = SecretCodec::default();
        assert!(!SecretCodec::is_encrypted("hunter2"));
        assert!(!SecretCodec::is_encrypted("ENC("));
        assert_eq!(codec.try_decrypt("hunter2"), Err(CodecError::NotEncrypted));
        assert_eq!(codec.decrypt("hunter2"), "");
    }

    #[test]
    fn test_garbage_payload_fails_safe() {
        let codec = SecretCodec::default();
        let result = codec.try_decrypt("ENC(CORRUPT_ENCRYPTED_DATA_INVALID)");
        assert!(matches!(result, Err(CodecError::Base64(_))));
        assert_eq!(codec.decrypt("ENC(CORRUPT_ENCRYPTED_DATA_INVALID)"), "");
    }

    #[test]
    fn test_truncated_payload() {
        let codec = SecretCodec::default();
        let token = format!("ENC({})", STANDARD.encode([0u8; 8]));
        assert_eq!(codec.try_decrypt(&token), Err(CodecError::Truncated(8)));
    }

    #[test]
    fn test_wrong_key_fails_safe() {
        let token = SecretCodec::from_passphrase("one").encrypt("secret").unwrap();
        let other = SecretCodec::from_passphrase("two");
        assert_eq!(other.try_decrypt(&token), Err(CodecError::Authentication));
        assert_eq!(other.decrypt(&token), "");
    }

    #[test]
    fn test_tampered_ciphertext_fails_safe() {
        let codec = SecretCodec::default();
        let token = codec.encrypt("secret").unwrap();
        let payload = &token[4..token.len() - 1];
        let mut blob = STANDARD.decode(payload).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        let tampered = format!("ENC({})", STANDARD.encode(blob));

        assert_eq!(codec.try_decrypt(&tampered), Err(CodecError::Authentication));
    }

    #[test]
    fn test_surrounding_whitespace_is_tolerated() {
        let codec = SecretCodec::default();
        let token = codec.encrypt("secret").unwrap();
        assert_eq!(codec.decrypt(&format!("  {}  ", token)), "secret");
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", SecretCodec::default());
        assert!(debug.contains("<redacted>"));
    }
}
