//! [`KeyMaterial`]: the raw symmetric key handed over by the credential provider.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{rand_core::RngCore, OsRng};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Byte length of the symmetric key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Errors produced while loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key material has an unexpected length.
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// The textual key is not valid standard base64.
    #[error("key is not valid base64")]
    InvalidEncoding,
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// The memory is overwritten with zeroes on drop to shorten the window during
/// which plaintext key material lives in RAM.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(Box<[u8; KEY_LEN]>);

impl KeyMaterial {
    /// Copy key bytes out of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice is not [`KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Decode a standard-base64 key, as it appears in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidEncoding`] for malformed base64 and
    /// [`KeyError::InvalidLength`] if the decoded key is not [`KEY_LEN`] bytes.
    pub fn from_base64(text: &str) -> Result<Self, KeyError> {
        let mut decoded = STANDARD
            .decode(text.trim())
            .map_err(|_| KeyError::InvalidEncoding)?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }

    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut buf = Box::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut buf[..]);
        Self(buf)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Standard-base64 form of the key, for the `keygen` command.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0[..])
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("KeyMaterial([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_accepts_exact_length() {
        let key = KeyMaterial::from_slice(&[0x42u8; KEY_LEN]).unwrap();
        assert_eq!(key.as_bytes(), &[0x42u8; KEY_LEN]);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            KeyMaterial::from_slice(&[0u8; 16]),
            Err(KeyError::InvalidLength(16))
        ));
        assert!(matches!(
            KeyMaterial::from_slice(&[0u8; 33]),
            Err(KeyError::InvalidLength(33))
        ));
    }

    #[test]
    fn base64_round_trip() {
        let key = KeyMaterial::generate();
        let text = key.to_base64();
        let parsed = KeyMaterial::from_base64(&text).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
    }

    #[test]
    fn from_base64_rejects_garbage() {
        assert!(matches!(
            KeyMaterial::from_base64("not base64!"),
            Err(KeyError::InvalidEncoding)
        ));
        assert!(matches!(
            KeyMaterial::from_base64(&STANDARD.encode([1u8; 8])),
            Err(KeyError::InvalidLength(8))
        ));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(
            KeyMaterial::generate().as_bytes(),
            KeyMaterial::generate().as_bytes()
        );
    }

    #[test]
    fn redacted_in_debug() {
        let key = KeyMaterial::from_slice(&[0xFFu8; KEY_LEN]).unwrap();
        let shown = format!("{key:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("255"));
    }
}
