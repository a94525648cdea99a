// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Filter resolution:
//! 1. `SITESMITH_LOG` environment variable (e.g. "info", "sitesmith=debug")
//! 2. default to `info`
//!
//! Logs go to STDERR so stdout stays free for whatever the build produces.

use anyhow::anyhow;
use tracing_subscriber::{EnvFilter, fmt};

use crate::errors::Result;

/// Install the global tracing subscriber.
///
/// Intended for binaries and demos; call once at startup. Fails if a
/// subscriber is already installed.
pub fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_env("SITESMITH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    Ok(())
}
