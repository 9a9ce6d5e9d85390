//! Transparent field-level encryption for bulk-stored documents.
//!
//! - [`crypto`]: the XChaCha20-Poly1305 [`Cipher`](crypto::Cipher), a
//!   multi-key [`Keyring`](crypto::Keyring), and raw key material.
//! - [`codec`]: per-type hooks and the [`DocumentCodec`](codec::DocumentCodec)
//!   that routes protected fields through the cipher during serde
//!   (de)serialization.
//! - [`credentials`]: a [`KeySelector`](credentials::KeySelector) exposing a
//!   single vetted key from a credential bundle.
//! - [`config`] and [`telemetry`]: environment configuration and logging for
//!   the `fieldcrypt` binary and embedding services.
//!
//! The persisted value format lives in the `common` crate.

pub mod codec;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod telemetry;

pub use codec::{CipherMode, CodecError, Document, DocumentCodec};
pub use crypto::{Cipher, CipherError, FieldCipher, KeyMaterial};
