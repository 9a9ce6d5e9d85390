//! Restricted access to credentials handed over by the upstream provider.
//!
//! # Module invariants
//!
//! - The full [`KeyBundle`] has no public field or getter. Callers receive a
//!   single vetted key through a named [`KeySelector`] method.
//! - Key values never appear in `Debug` output or log fields.

pub mod selector;

pub use selector::{
    CredentialsError, KeyBundle, KeyInfo, KeySelector, SECONDARY_MASTER_KEY_JUSTIFICATION,
};
