//! Configuration loading and validation for field encryption.
//!
//! All values are read from environment variables at startup. The process
//! exits with a clear error message if any variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::codec::CipherMode;
use crate::crypto::{Cipher, KeyMaterial, Keyring};

/// Validated field encryption configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base64 encoding of the 32-byte key used for all new encryptions.
    /// **Required** unless `require_encryption` is `false`.
    #[serde(default)]
    pub field_encryption_key: Option<String>,

    /// Comma-separated base64 keys that may still open older values.
    #[serde(default)]
    pub field_decryption_keys: Option<String>,

    /// Refuse to start without a key rather than store secrets unencrypted.
    #[serde(default = "default_require_encryption")]
    pub require_encryption: bool,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_require_encryption() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is absent where required or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        match &self.field_encryption_key {
            Some(key) => {
                KeyMaterial::from_base64(key).context("FIELD_ENCRYPTION_KEY is invalid")?;
            }
            None if self.require_encryption => {
                anyhow::bail!(
                    "FIELD_ENCRYPTION_KEY is required unless REQUIRE_ENCRYPTION=false"
                );
            }
            None => {}
        }

        let retired = self.retired_keys();
        if !retired.is_empty() && self.field_encryption_key.is_none() {
            anyhow::bail!("FIELD_DECRYPTION_KEYS requires FIELD_ENCRYPTION_KEY");
        }
        for (i, key) in retired.iter().enumerate() {
            KeyMaterial::from_base64(key)
                .with_context(|| format!("FIELD_DECRYPTION_KEYS entry {i} is invalid"))?;
        }
        Ok(())
    }

    fn retired_keys(&self) -> Vec<&str> {
        self.field_decryption_keys
            .as_deref()
            .map(|keys| {
                keys.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Build the cipher mode described by this configuration.
    ///
    /// A single key yields a [`Cipher`]; retired keys add a [`Keyring`] in
    /// front of it; no key yields [`CipherMode::Disabled`].
    ///
    /// # Errors
    ///
    /// Returns an error if a key fails to decode.
    pub fn cipher_mode(&self) -> Result<CipherMode> {
        let Some(active) = &self.field_encryption_key else {
            return Ok(CipherMode::Disabled);
        };
        let active = Cipher::new(
            &KeyMaterial::from_base64(active).context("FIELD_ENCRYPTION_KEY is invalid")?,
        );

        let retired = self.retired_keys();
        if retired.is_empty() {
            return Ok(CipherMode::enabled(active));
        }

        let mut ciphers = vec![active];
        for key in retired {
            let key = KeyMaterial::from_base64(key).context("FIELD_DECRYPTION_KEYS is invalid")?;
            ciphers.push(Cipher::new(&key));
        }
        Ok(CipherMode::enabled(Keyring::new(ciphers)?))
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("field_encryption_key", &self.field_encryption_key.as_ref().map(|_| "[REDACTED]"))
            .field("field_decryption_keys", &self.retired_keys().len())
            .field("require_encryption", &self.require_encryption)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::FieldCipher;

    fn key() -> String {
        KeyMaterial::generate().to_base64()
    }

    fn cfg(active: Option<String>, retired: Option<String>) -> Config {
        Config {
            field_encryption_key: active,
            field_decryption_keys: retired,
            require_encryption: default_require_encryption(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert!(default_require_encryption());
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_rejects_missing_key_when_required() {
        assert!(cfg(None, None).validate().is_err());
    }

    #[test]
    fn validate_allows_missing_key_when_not_required() {
        let mut c = cfg(None, None);
        c.require_encryption = false;
        assert!(c.validate().is_ok());
        assert!(!c.cipher_mode().unwrap().is_enabled());
    }

    #[test]
    fn validate_rejects_short_key() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        let c = cfg(Some(STANDARD.encode([0u8; 16])), None);
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_retired_key() {
        let c = cfg(Some(key()), Some(format!("{}, nope", key())));
        let err = c.validate().unwrap_err();
        assert!(format!("{err:#}").contains("entry 1"));
    }

    #[test]
    fn validate_rejects_retired_keys_without_active_key() {
        let mut c = cfg(None, Some(key()));
        c.require_encryption = false;
        assert!(c.validate().is_err());
    }

    #[test]
    fn cipher_mode_opens_values_from_retired_keys() {
        let old = key();
        let sealed = Cipher::new(&KeyMaterial::from_base64(&old).unwrap())
            .encrypt(b"old secret")
            .unwrap();

        let c = cfg(Some(key()), Some(format!(" {old} ,")));
        c.validate().unwrap();
        let CipherMode::Enabled(cipher) = c.cipher_mode().unwrap() else {
            panic!("expected an enabled cipher");
        };
        assert_eq!(cipher.decrypt(&sealed).unwrap(), b"old secret");
    }

    #[test]
    fn debug_redacts_keys() {
        let active = key();
        let c = cfg(Some(active.clone()), None);
        let shown = format!("{c:?}");
        assert!(!shown.contains(&active));
        assert!(shown.contains("REDACTED"));
    }
}
