//! Subscriber setup for binaries hosting the engines.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the process owner.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{PicarError, Result};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level is used.
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| PicarError::parse_error("log level", e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| PicarError::parse_error("log subscriber", e.to_string()))
}
