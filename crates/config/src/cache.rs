//! File handle cache configuration

use std::time::Duration;

use serde::Deserialize;

/// Open-file cache settings
///
/// The cache bounds how many log file descriptors stay open at once, not
/// how many file destinations may be registered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of concurrently open file handles
    /// Default: 16
    pub capacity: usize,

    /// Close handles that have not been written for this long
    /// Default: 2m
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// How long a worker waits for a free slot when every handle is leased
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            idle_timeout: Duration::from_secs(120),
            acquire_timeout: Duration::from_secs(1),
        }
    }
}
