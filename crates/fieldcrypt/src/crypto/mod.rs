//! XChaCha20-Poly1305 field encryption primitives.
//!
//! This module is free of serialization concerns. It provides the
//! [`FieldCipher`] capability the document codec is built on.
//!
//! # Ciphertext format
//!
//! ```text
//! ENC*<base64-std-padded(nonce(24) || ciphertext || tag(16))>
//! ```
//!
//! Values without the `ENC*` marker are legacy plaintext and are passed
//! through unchanged on decrypt.

pub mod cipher;
pub mod key;
pub mod keyring;

pub use cipher::{Cipher, CipherError, FieldCipher, Opened};
pub use key::{KeyError, KeyMaterial, KEY_LEN};
pub use keyring::{Keyring, KeyringError};
