//! `fieldcrypt` — operator tool for protected field values.
//!
//! Startup sequence:
//! 1. Parse the command line. `keygen` needs no configuration and runs at once.
//! 2. Load and validate [`Config`] from environment variables.
//! 3. Initialise structured logging.
//! 4. Build the [`CipherMode`] and run the subcommand.

use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use fieldcrypt::codec::CipherMode;
use fieldcrypt::config::Config;
use fieldcrypt::crypto::KeyMaterial;
use fieldcrypt::telemetry;

#[derive(Debug, Parser)]
#[command(name = "fieldcrypt", version, about = "Seal and open protected field values")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encrypt a value with FIELD_ENCRYPTION_KEY.
    Seal {
        /// Plaintext to seal; read from stdin when omitted.
        value: Option<String>,
    },
    /// Decrypt a stored value. Unmarked values are printed unchanged.
    Open {
        /// Stored value; read from stdin when omitted.
        value: Option<String>,
    },
    /// Print a fresh base64 key suitable for FIELD_ENCRYPTION_KEY.
    Keygen,
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Keygen => {
            println!("{}", KeyMaterial::generate().to_base64());
        }
        Command::Seal { value } => {
            let CipherMode::Enabled(cipher) = startup()? else {
                anyhow::bail!("sealing requires FIELD_ENCRYPTION_KEY");
            };
            let plaintext = value_or_stdin(value)?;
            println!("{}", cipher.encrypt(plaintext.as_bytes())?);
        }
        Command::Open { value } => {
            let mode = startup()?;
            let stored = value_or_stdin(value)?;
            let plaintext = match &mode {
                CipherMode::Enabled(cipher) => cipher.decrypt(&stored)?,
                CipherMode::Disabled if common::is_encrypted(&stored) => {
                    anyhow::bail!("value is encrypted but FIELD_ENCRYPTION_KEY is not set");
                }
                CipherMode::Disabled => stored.into_bytes(),
            };
            let text = String::from_utf8(plaintext).context("decrypted value is not UTF-8")?;
            println!("{text}");
        }
    }
    Ok(())
}

/// Load configuration, start logging, and build the cipher mode.
fn startup() -> Result<CipherMode> {
    let cfg = Config::from_env().map_err(|e| {
        // Logging is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    telemetry::init_telemetry(&cfg.log_level)?;
    let mode = cfg.cipher_mode()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        encryption = mode.is_enabled(),
        "fieldcrypt starting"
    );
    Ok(mode)
}

fn value_or_stdin(value: Option<String>) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read value from stdin")?;
    Ok(buf.trim_end_matches(['\r', '\n']).to_owned())
}
