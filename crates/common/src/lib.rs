//! Common types and errors shared across `field-crypt` crates.
//!
//! Nothing in here depends on a cipher implementation: it describes the
//! persisted shape of protected values so that any reader of stored documents
//! can classify them.

pub mod envelope;
pub mod error;

pub use envelope::{is_encrypted, EncodedValue, Envelope, MARKER, NONCE_LEN, TAG_LEN};
pub use error::EnvelopeError;
