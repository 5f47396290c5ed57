//! Configuration validation
//!
//! Checks for:
//! - Non-zero capacities and worker count
//! - Non-zero timeouts that would otherwise busy-spin or never wait

use fanlog_protocol::{Error, Result};

use crate::EngineConfig;

/// Validate the entire configuration
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    if config.queue.capacity == 0 {
        return Err(Error::invalid_config(
            "queue.capacity",
            "must be at least 1",
        ));
    }

    if config.workers.count == 0 {
        return Err(Error::invalid_config("workers.count", "must be at least 1"));
    }

    if config.workers.housekeeping_interval.is_zero() {
        return Err(Error::invalid_config(
            "workers.housekeeping_interval",
            "must be non-zero",
        ));
    }

    if config.cache.capacity == 0 {
        return Err(Error::invalid_config(
            "cache.capacity",
            "must be at least 1",
        ));
    }

    if config.cache.acquire_timeout.is_zero() {
        return Err(Error::invalid_config(
            "cache.acquire_timeout",
            "must be non-zero",
        ));
    }

    if config.quarantine_threshold == 0 {
        return Err(Error::invalid_config(
            "quarantine_threshold",
            "must be at least 1",
        ));
    }

    Ok(())
}
