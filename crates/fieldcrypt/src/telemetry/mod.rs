//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No secret values or key material** may appear in any log field. Keys
//!   are identified only by [`Cipher::fingerprint`](crate::crypto::Cipher::fingerprint).
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden by
//!   `RUST_LOG` when set.

pub mod init;

pub use init::init_telemetry;
