//! Worker pool configuration

use std::time::Duration;

use serde::Deserialize;

/// Worker pool settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of dispatch worker threads
    /// Default: 2
    pub count: usize,

    /// How often an idle worker runs housekeeping (cache idle eviction)
    /// Default: 2s
    #[serde(with = "humantime_serde")]
    pub housekeeping_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            housekeeping_interval: Duration::from_secs(2),
        }
    }
}
