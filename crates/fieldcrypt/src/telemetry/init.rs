//! Tracing subscriber initialisation.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// Configures a JSON-formatted [`tracing_subscriber`] layer writing to stderr,
/// so that stdout stays reserved for command output.
///
/// # Errors
///
/// Returns an error if `log_level` is not a valid filter directive or a global
/// subscriber is already installed.
pub fn init_telemetry(log_level: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid LOG_LEVEL directive: {log_level}"))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_level() {
        // Only fails on the directive when RUST_LOG is not set for the test run.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(init_telemetry("not==a==level").is_err());
        }
    }
}
