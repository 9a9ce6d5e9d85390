//! Type hooks and the document codec that drives them.
//!
//! # Module invariants
//!
//! - Hooks are registered before a [`DocumentCodec`] exists; a finished
//!   [`Registry`] cannot be mutated.
//! - Zero values are never emitted, so absent and empty secrets never produce
//!   ciphertext.
//! - Cipher errors reach the caller unchanged and always before any parse of
//!   the decrypted bytes.

pub mod document;
pub mod registry;
pub mod secure;

pub use document::{
    CipherMode, CodecError, Disposition, Document, DocumentCodec, Encoded, FieldDecoder,
    FieldEncoder, FieldReport,
};
pub use registry::{Hook, HookError, Protected, Registry, RegistryBuilder, RegistryError};
pub use secure::{register_builtins, SecureBytes, SecureString};
