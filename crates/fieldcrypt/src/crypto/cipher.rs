//! XChaCha20-Poly1305 encryption and decryption of individual field values.
//!
//! **Algorithm choice:** XChaCha20-Poly1305 has a 192-bit nonce, wide enough
//! that a fresh random nonce per call is safe under a single long-lived key.
//! The cipher therefore holds no nonce state at all.
//!
//! **Never derive the nonce from a counter or accept one from the caller.**
//! Nonce reuse under a fixed key breaks both confidentiality and authentication.

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Key, XChaCha20Poly1305, XNonce,
};
use common::envelope::{EncodedValue, Envelope, NONCE_LEN};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use super::key::{KeyMaterial, KEY_LEN};

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    KeySize(usize),

    /// The value is marked as encrypted but could not be authenticated:
    /// tampering, truncation, a malformed payload, or the wrong key.
    #[error("authentication failed for encrypted value")]
    Authentication,

    /// Sealing failed. Only reachable for plaintexts beyond the AEAD length limit.
    #[error("aead seal failed")]
    Seal,

    /// The authenticated plaintext is not UTF-8 where a string was requested.
    #[error("decrypted value is not valid UTF-8")]
    Utf8,
}

/// Outcome of opening a stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// The value carried the marker and authenticated under the held key.
    Decrypted(Vec<u8>),
    /// The value carried no marker and was left untouched.
    PassThrough,
}

/// The encrypt/decrypt capability supplied to the document codec.
#[cfg_attr(test, mockall::automock)]
pub trait FieldCipher: Send + Sync {
    /// Seal `plaintext` into a marked, encoded value.
    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError>;

    /// Open a stored value, passing unmarked values through.
    fn open(&self, value: &str) -> Result<Opened, CipherError>;

    /// Decrypt a stored value to bytes; unmarked values come back unchanged.
    fn decrypt(&self, value: &str) -> Result<Vec<u8>, CipherError> {
        match self.open(value)? {
            Opened::Decrypted(plaintext) => Ok(plaintext),
            Opened::PassThrough => Ok(value.as_bytes().to_vec()),
        }
    }
}

/// A single-key AEAD cipher.
///
/// Immutable after construction and cheap to clone; one instance can serve
/// any number of concurrent callers.
#[derive(Clone)]
pub struct Cipher {
    aead: XChaCha20Poly1305,
    fingerprint: String,
}

impl Cipher {
    /// Build a cipher over `key`.
    pub fn new(key: &KeyMaterial) -> Self {
        Self {
            aead: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
            fingerprint: fingerprint(key.as_bytes()),
        }
    }

    /// Build a cipher from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeySize`] if `key` is not [`KEY_LEN`] bytes.
    pub fn from_slice(key: &[u8]) -> Result<Self, CipherError> {
        let key = KeyMaterial::from_slice(key).map_err(|_| CipherError::KeySize(key.len()))?;
        Ok(Self::new(&key))
    }

    /// Non-secret identifier of the key, safe to log.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encrypt a UTF-8 string.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<String, CipherError> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Decrypt to a UTF-8 string; unmarked values come back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Authentication`] on any verification failure and
    /// [`CipherError::Utf8`] if the authenticated plaintext is not UTF-8.
    pub fn decrypt_str(&self, value: &str) -> Result<String, CipherError> {
        String::from_utf8(self.decrypt(value)?).map_err(|_| CipherError::Utf8)
    }
}

impl FieldCipher for Cipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = self
            .aead
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::Seal)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(nonce.as_slice());

        Ok(Envelope {
            nonce: nonce_bytes,
            sealed,
        }
        .to_string_repr())
    }

    fn open(&self, value: &str) -> Result<Opened, CipherError> {
        let envelope = match EncodedValue::parse(value) {
            Ok(EncodedValue::Plain(_)) => return Ok(Opened::PassThrough),
            Ok(EncodedValue::Encrypted(envelope)) => envelope,
            Err(e) => {
                debug!(error = %e, key = %self.fingerprint, "malformed encrypted value");
                return Err(CipherError::Authentication);
            }
        };

        self.aead
            .decrypt(XNonce::from_slice(&envelope.nonce), envelope.sealed.as_ref())
            .map(Opened::Decrypted)
            .map_err(|_| CipherError::Authentication)
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

fn fingerprint(key: &[u8; KEY_LEN]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    let digest = Sha256::digest(key);
    URL_SAFE_NO_PAD.encode(&digest[..8])
}
