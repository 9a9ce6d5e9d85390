//! The persisted encoding convention for protected field values.
//!
//! A stored string is either legacy plaintext or an encrypted envelope:
//!
//! ```text
//! ENC*<base64-std-padded(nonce || ciphertext || tag)>
//! ```
//!
//! The marker prefix lets a store holding a mix of encrypted and pre-encryption
//! documents be read through a single decode path. This format is part of every
//! stored document and must stay byte-for-byte stable.

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::EnvelopeError;

/// Prefix that appears at the start of every encrypted field value.
pub const MARKER: &str = "ENC*";

/// Byte length of an XChaCha20-Poly1305 nonce (24 bytes = 192 bits).
pub const NONCE_LEN: usize = 24;

/// Byte length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;

/// Returns `true` if `value` carries the encryption marker.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(MARKER)
}

/// A parsed, encrypted field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub sealed: Vec<u8>,
}

impl Envelope {
    /// Encode this value to its canonical string representation.
    pub fn to_string_repr(&self) -> String {
        let mut raw = Vec::with_capacity(NONCE_LEN + self.sealed.len());
        raw.extend_from_slice(&self.nonce);
        raw.extend_from_slice(&self.sealed);

        let mut out = String::with_capacity(MARKER.len() + raw.len().div_ceil(3) * 4);
        out.push_str(MARKER);
        STANDARD.encode_string(&raw, &mut out);
        out
    }
}

impl FromStr for Envelope {
    type Err = EnvelopeError;

    /// Parse an encrypted field string back into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingMarker`] if the value is not marked,
    /// [`EnvelopeError::Base64`] if the payload is not valid base64, and
    /// [`EnvelopeError::Truncated`] if it is too short to hold a nonce and tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s.strip_prefix(MARKER).ok_or(EnvelopeError::MissingMarker)?;
        let raw = STANDARD.decode(payload)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(EnvelopeError::Truncated(raw.len()));
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&raw[..NONCE_LEN]);

        Ok(Self {
            nonce,
            sealed: raw[NONCE_LEN..].to_vec(),
        })
    }
}

/// A stored string classified by the encoding convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedValue<'a> {
    /// No marker: a legacy or intentionally unencrypted value, returned as-is.
    Plain(&'a str),
    /// Marker present and payload well-formed.
    Encrypted(Envelope),
}

impl<'a> EncodedValue<'a> {
    /// Classify `value`, parsing the envelope if it is marked.
    ///
    /// # Errors
    ///
    /// Propagates [`Envelope`] parse errors for marked values with a
    /// malformed payload. Unmarked values never fail.
    pub fn parse(value: &'a str) -> Result<Self, EnvelopeError> {
        if is_encrypted(value) {
            value.parse().map(EncodedValue::Encrypted)
        } else {
            Ok(EncodedValue::Plain(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            nonce: [7u8; NONCE_LEN],
            sealed: vec![0xAB; TAG_LEN + 5],
        }
    }

    #[test]
    fn string_repr_round_trip() {
        let env = sample();
        let s = env.to_string_repr();
        assert!(s.starts_with("ENC*"));
        assert_eq!(s.parse::<Envelope>().unwrap(), env);
    }

    #[test]
    fn string_repr_uses_padded_standard_alphabet() {
        // 24 + 17 = 41 bytes -> 56 base64 chars with one '=' of padding.
        let env = Envelope {
            nonce: [0xFF; NONCE_LEN],
            sealed: vec![0xFB; TAG_LEN + 1],
        };
        let s = env.to_string_repr();
        let payload = s.strip_prefix(MARKER).unwrap();
        assert_eq!(payload.len(), 56);
        assert!(payload.ends_with('='));
        assert!(payload.contains('/') || payload.contains('+'));
    }

    #[test]
    fn from_str_rejects_missing_marker() {
        assert!(matches!(
            Envelope::from_str("AAAA"),
            Err(EnvelopeError::MissingMarker)
        ));
    }

    #[test]
    fn from_str_rejects_bad_base64() {
        assert!(matches!(
            Envelope::from_str("ENC*!!!not base64"),
            Err(EnvelopeError::Base64(_))
        ));
    }

    #[test]
    fn from_str_rejects_truncated_payload() {
        let short = format!("{MARKER}{}", STANDARD.encode([0u8; NONCE_LEN]));
        assert!(matches!(
            Envelope::from_str(&short),
            Err(EnvelopeError::Truncated(NONCE_LEN))
        ));
        assert!(matches!(
            Envelope::from_str(MARKER),
            Err(EnvelopeError::Truncated(0))
        ));
    }

    #[test]
    fn parse_classifies_values() {
        assert_eq!(
            EncodedValue::parse("plain text").unwrap(),
            EncodedValue::Plain("plain text")
        );
        assert_eq!(EncodedValue::parse("").unwrap(), EncodedValue::Plain(""));

        let env = sample();
        let s = env.to_string_repr();
        assert_eq!(EncodedValue::parse(&s).unwrap(), EncodedValue::Encrypted(env));
    }

    #[test]
    fn marker_is_case_sensitive() {
        assert!(!is_encrypted("enc*abc"));
        assert!(!is_encrypted(" ENC*abc"));
        assert!(is_encrypted("ENC*"));
    }
}
