//! [`Keyring`]: encrypt under the active key, decrypt under any held key.
//!
//! Documents written before the active key changed stay readable as long as the
//! key that sealed them is still held. Deciding which keys are held is left to
//! the caller.

use common::envelope::is_encrypted;
use thiserror::Error;
use tracing::debug;

use super::cipher::{Cipher, CipherError, FieldCipher, Opened};

/// Errors produced while assembling a [`Keyring`].
#[derive(Debug, Error)]
pub enum KeyringError {
    /// A keyring needs at least the active key.
    #[error("keyring must hold at least one key")]
    Empty,
}

/// An ordered set of ciphers. The first is the active one.
#[derive(Debug, Clone)]
pub struct Keyring {
    ciphers: Vec<Cipher>,
}

impl Keyring {
    /// Build a keyring from `ciphers`, the first being the active key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyringError::Empty`] if `ciphers` is empty.
    pub fn new(ciphers: Vec<Cipher>) -> Result<Self, KeyringError> {
        if ciphers.is_empty() {
            return Err(KeyringError::Empty);
        }
        Ok(Self { ciphers })
    }

    /// The cipher used for every new encryption.
    pub fn active(&self) -> &Cipher {
        &self.ciphers[0]
    }

    /// Number of keys held, active key included.
    pub fn len(&self) -> usize {
        self.ciphers.len()
    }

    /// Always `false`; construction rejects empty keyrings.
    pub fn is_empty(&self) -> bool {
        self.ciphers.is_empty()
    }
}

impl FieldCipher for Keyring {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        self.active().encrypt(plaintext)
    }

    fn open(&self, value: &str) -> Result<Opened, CipherError> {
        if !is_encrypted(value) {
            return Ok(Opened::PassThrough);
        }
        for (position, cipher) in self.ciphers.iter().enumerate() {
            if let Ok(opened) = cipher.open(value) {
                if position > 0 {
                    debug!(key = %cipher.fingerprint(), position, "value opened with retired key");
                }
                return Ok(opened);
            }
        }
        Err(CipherError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KeyMaterial;

    fn cipher() -> Cipher {
        Cipher::new(&KeyMaterial::generate())
    }

    #[test]
    fn empty_keyring_rejected() {
        assert!(matches!(Keyring::new(vec![]), Err(KeyringError::Empty)));
    }

    #[test]
    fn encrypts_with_active_key() {
        let active = cipher();
        let retired = cipher();
        let ring = Keyring::new(vec![active.clone(), retired.clone()]).unwrap();
        assert_eq!(ring.len(), 2);
        assert!(!ring.is_empty());

        let encrypted = ring.encrypt(b"fresh").unwrap();
        assert_eq!(active.decrypt(&encrypted).unwrap(), b"fresh");
        assert!(retired.decrypt(&encrypted).is_err());
    }

    #[test]
    fn decrypts_values_sealed_by_retired_key() {
        let active = cipher();
        let retired = cipher();
        let old_value = retired.encrypt(b"written last year").unwrap();

        let ring = Keyring::new(vec![active, retired]).unwrap();
        assert_eq!(ring.decrypt(&old_value).unwrap(), b"written last year");
    }

    #[test]
    fn unknown_key_fails_auth() {
        let ring = Keyring::new(vec![cipher(), cipher()]).unwrap();
        let foreign = cipher().encrypt(b"not ours").unwrap();
        assert!(matches!(ring.open(&foreign), Err(CipherError::Authentication)));
    }

    #[test]
    fn unmarked_values_pass_through() {
        let ring = Keyring::new(vec![cipher()]).unwrap();
        assert_eq!(ring.open("legacy").unwrap(), Opened::PassThrough);
        assert_eq!(ring.decrypt("legacy").unwrap(), b"legacy");
    }
}
