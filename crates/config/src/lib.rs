//! Fanlog configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use fanlog_config::EngineConfig;
//! use std::str::FromStr;
//!
//! let config = EngineConfig::from_str("[queue]\ncapacity = 64").unwrap();
//! assert_eq!(config.queue.capacity, 64);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! quarantine_threshold = 3
//!
//! [queue]
//! capacity = 256
//! backpressure_policy = "drop-oldest"
//! enqueue_timeout = "2s"
//!
//! [workers]
//! count = 4
//! housekeeping_interval = "1s"
//!
//! [cache]
//! capacity = 8
//! idle_timeout = "90s"
//! acquire_timeout = "500ms"
//! ```

mod cache;
mod queue;
mod validation;
mod worker;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use fanlog_protocol::{Error, Result, DEFAULT_QUARANTINE_THRESHOLD};

pub use cache::CacheConfig;
pub use queue::{BackpressurePolicy, QueueConfig};
pub use worker::WorkerConfig;

/// Main engine configuration
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Consecutive delivery failures before a destination is quarantined
    pub quarantine_threshold: u32,

    /// Dispatch queue settings
    pub queue: QueueConfig,

    /// Worker pool settings
    pub workers: WorkerConfig,

    /// Open-file cache settings
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quarantine_threshold: DEFAULT_QUARANTINE_THRESHOLD,
            queue: QueueConfig::default(),
            workers: WorkerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(s)
            .map_err(|e| Error::invalid_config("engine config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Called automatically when parsing; exposed for configurations built
    /// directly in code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for EngineConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
