use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// timestamp LEVEL target: message
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

const QUIET_TARGETS: &[(&str, &str)] = &[
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("reqwest", "warn"),
    ("h2", "warn"),
    ("rustls", "warn"),
];

fn build_env_filter(level: &str) -> Result<EnvFilter> {
    let mut directives = vec![level.trim().to_string()];
    for (target, lvl) in QUIET_TARGETS {
        directives.push(format!("{target}={lvl}"));
    }
    let filter = directives.join(",");
    EnvFilter::try_new(&filter)
        .map_err(|e| Error::logging(format!("invalid filter '{filter}': {e}")))
}

/// Installs the global `tracing` subscriber. `RUST_LOG`, when set, replaces
/// the configured level. If a subscriber is already installed this is a
/// no-op.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_env_filter(&config.level)?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
