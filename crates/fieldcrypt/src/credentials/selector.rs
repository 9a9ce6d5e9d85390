//! [`KeySelector`]: the only way to obtain a key from a [`KeyBundle`].

use serde::Deserialize;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Why the secondary master key is the sanctioned one.
pub const SECONDARY_MASTER_KEY_JUSTIFICATION: &str =
    "the secondary master key is used so that the primary key stays unused and can be \
     regenerated immediately if a credential leaks, without disrupting this service";

/// Errors produced while reading a key bundle.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The credential source returned something that is not a key bundle.
    #[error("malformed key bundle: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Every key variant returned by the upstream credential source.
///
/// The type has no accessors. Keys are reachable only
/// through [`KeySelector`].
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct KeyBundle {
    primary_master_key: String,
    secondary_master_key: String,
    primary_readonly_master_key: String,
    secondary_readonly_master_key: String,
}

impl KeyBundle {
    /// Assemble a bundle from its four variants.
    pub fn new(
        primary_master_key: impl Into<String>,
        secondary_master_key: impl Into<String>,
        primary_readonly_master_key: impl Into<String>,
        secondary_readonly_master_key: impl Into<String>,
    ) -> Self {
        Self {
            primary_master_key: primary_master_key.into(),
            secondary_master_key: secondary_master_key.into(),
            primary_readonly_master_key: primary_readonly_master_key.into(),
            secondary_readonly_master_key: secondary_readonly_master_key.into(),
        }
    }

    /// Parse the credential source's JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Malformed`] if a variant is missing or the
    /// JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self, CredentialsError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl std::fmt::Debug for KeyBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyBundle([REDACTED])")
    }
}

/// A single vetted key together with the reason it may be used.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyInfo {
    /// The key value.
    pub value: String,
    /// Why this variant is safe to use.
    #[zeroize(skip)]
    pub justification: &'static str,
}

impl std::fmt::Debug for KeyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyInfo")
            .field("value", &"[REDACTED]")
            .field("justification", &self.justification)
            .finish()
    }
}

/// Restrictive view over a [`KeyBundle`].
#[derive(Clone, Debug)]
pub struct KeySelector {
    bundle: KeyBundle,
}

impl KeySelector {
    /// Take ownership of the full bundle.
    pub fn new(bundle: KeyBundle) -> Self {
        Self { bundle }
    }

    /// The secondary master key.
    pub fn secondary_master_key(&self) -> KeyInfo {
        KeyInfo {
            value: self.bundle.secondary_master_key.clone(),
            justification: SECONDARY_MASTER_KEY_JUSTIFICATION,
        }
    }
}
