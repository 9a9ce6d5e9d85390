//! Common error types shared across crates.

use thiserror::Error;

/// Errors produced while parsing an encrypted field value.
///
/// The cipher layer folds every variant into a single authentication failure
/// before it reaches callers; the detail is kept here for logging and tests.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The value does not start with the encryption marker.
    #[error("value is not marked as encrypted")]
    MissingMarker,

    /// The payload after the marker is not valid standard base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded payload is too short to hold a nonce and tag.
    #[error("encrypted payload truncated: {0} bytes")]
    Truncated(usize),
}
