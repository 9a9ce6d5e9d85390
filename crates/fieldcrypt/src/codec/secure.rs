//! Built-in protected field types and their hooks.
//!
//! Canonical forms are text. Binary values are carried as standard base64 so
//! that an unencrypted field is still a readable string.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{SigningKey, KEYPAIR_LENGTH};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::registry::{Hook, HookError, Protected, RegistryBuilder, RegistryError};

/// A secret string stored encrypted at rest. Empty means absent.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureString(String);

impl SecureString {
    /// Wrap `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the zero value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecureString([REDACTED])")
    }
}

impl Protected for SecureString {
    fn hook() -> Hook<Self> {
        Hook::<SecureString>::new(
            |s| Ok(s.0.as_bytes().to_vec()),
            |bytes| {
                std::str::from_utf8(bytes)
                    .map(SecureString::new)
                    .map_err(|_| HookError::InvalidUtf8)
            },
        )
        .with_zero(SecureString::is_empty)
    }
}

/// Secret bytes stored encrypted at rest. Empty means absent.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureBytes(Vec<u8>);

impl SecureBytes {
    /// Wrap `value`.
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` for the zero value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureBytes([REDACTED; {}])", self.0.len())
    }
}

impl Protected for SecureBytes {
    fn hook() -> Hook<Self> {
        Hook::<SecureBytes>::new(
            |b| Ok(STANDARD.encode(&b.0).into_bytes()),
            |text| {
                STANDARD
                    .decode(text)
                    .map(SecureBytes::new)
                    .map_err(|_| HookError::InvalidBase64)
            },
        )
        .with_zero(SecureBytes::is_empty)
    }
}

// Canonical form is base64 of the 64-byte keypair encoding (secret || public)
// so that decoding checks the stored public half against the secret half.
impl Protected for SigningKey {
    fn hook() -> Hook<Self> {
        Hook::<SigningKey>::new(
            |key| {
                let raw = Zeroizing::new(key.to_keypair_bytes());
                Ok(STANDARD.encode(raw.as_slice()).into_bytes())
            },
            |text| {
                let bytes = Zeroizing::new(
                    STANDARD
                        .decode(text)
                        .map_err(|_| HookError::InvalidBase64)?,
                );
                let raw: &[u8; KEYPAIR_LENGTH] =
                    bytes.as_slice().try_into().map_err(|_| HookError::InvalidLength {
                        expected: KEYPAIR_LENGTH,
                        actual: bytes.len(),
                    })?;
                SigningKey::from_keypair_bytes(raw).map_err(|e| HookError::Invalid(e.to_string()))
            },
        )
    }
}

/// Register the hooks for every built-in protected type.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateRegistration`] if any of them is already
/// registered on `builder`.
pub fn register_builtins(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register_protected::<SecureString>()?
        .register_protected::<SecureBytes>()?
        .register_protected::<SigningKey>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::registry::Registry;
    use chacha20poly1305::aead::OsRng;

    #[test]
    fn secure_string_hook() {
        let hook = SecureString::hook();
        let bytes = (hook.encode)(&SecureString::from("hunter2")).unwrap();
        assert_eq!(bytes, b"hunter2");
        assert_eq!((hook.decode)(&bytes).unwrap().expose(), "hunter2");
        assert!((hook.is_zero)(&SecureString::default()));
        assert!(matches!((hook.decode)(&[0xFF, 0xFE]), Err(HookError::InvalidUtf8)));
    }

    #[test]
    fn secure_bytes_hook() {
        let hook = SecureBytes::hook();
        let value = SecureBytes::new(vec![0u8, 1, 2, 255]);
        let text = (hook.encode)(&value).unwrap();
        assert_eq!(text, b"AAEC/w==");
        assert_eq!((hook.decode)(&text).unwrap(), value);
        assert!(matches!((hook.decode)(b"hunter2"), Err(HookError::InvalidBase64)));
        assert!((hook.is_zero)(&SecureBytes::default()));
        assert!(!(hook.is_zero)(&value));
    }

    #[test]
    fn signing_key_hook_round_trip() {
        let hook = SigningKey::hook();
        let key = SigningKey::generate(&mut OsRng);
        let text = (hook.encode)(&key).unwrap();
        assert_eq!(STANDARD.decode(&text).unwrap(), key.to_keypair_bytes());
        let decoded = (hook.decode)(&text).unwrap();
        assert_eq!(decoded.to_bytes(), key.to_bytes());
        assert_eq!(decoded.verifying_key(), key.verifying_key());
    }

    #[test]
    fn signing_key_hook_rejects_bad_input() {
        let hook = SigningKey::hook();
        assert!(matches!(
            (hook.decode)(STANDARD.encode([0u8; 32]).as_bytes()),
            Err(HookError::InvalidLength { expected: 64, actual: 32 })
        ));
        assert!(matches!((hook.decode)(b"not a key"), Err(HookError::InvalidBase64)));

        // Public half that does not belong to the secret half.
        let key = SigningKey::generate(&mut OsRng);
        let mut bytes = key.to_keypair_bytes();
        bytes[40] ^= 0xFF;
        assert!(matches!(
            (hook.decode)(STANDARD.encode(bytes).as_bytes()),
            Err(HookError::Invalid(_))
        ));
    }

    #[test]
    fn secrets_redacted_in_debug() {
        assert!(!format!("{:?}", SecureString::from("hunter2")).contains("hunter2"));
        assert!(format!("{:?}", SecureBytes::new(vec![1, 2, 3])).contains("REDACTED; 3"));
    }

    #[test]
    fn builtins_register_once() {
        let mut builder = Registry::builder();
        register_builtins(&mut builder).unwrap();
        assert!(register_builtins(&mut builder).is_err());
        let registry = builder.build();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains::<SigningKey>());
    }
}
