//! Structured logging setup for the CLI.
//!
//! Diagnostics go to stderr so stdout stays reserved for command output.

use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::error::{AppError, Result};

/// `RUST_LOG` wins; otherwise the configured level
fn create_env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| AppError::Config(format!("Invalid log filter '{level}': {e}"))),
    }
}

/// Install the global subscriber described by `config`
pub fn init_logging(config: &Config) -> Result<()> {
    let env_filter = create_env_filter(config.effective_log_level())?;
    let ansi = !config.output.no_color && atty::is(atty::Stream::Stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(ansi)
                .compact()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(false)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };
    installed.map_err(|e| AppError::Config(format!("Failed to initialize logging: {e}")))?;

    tracing::debug!(
        level = config.effective_log_level(),
        format = ?config.logging.format,
        "Logging initialized"
    );
    Ok(())
}
