//! Dispatch queue configuration

use std::time::Duration;

use serde::Deserialize;

/// What `enqueue` does when the dispatch queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackpressurePolicy {
    /// Wait for space up to the enqueue timeout, then fail
    #[default]
    Block,
    /// Evict the oldest queued job to make room; the eviction is reported
    DropOldest,
    /// Reject the incoming job immediately
    DropNewest,
}

impl BackpressurePolicy {
    /// Get the string name of this policy
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::DropOldest => "drop-oldest",
            Self::DropNewest => "drop-newest",
        }
    }
}

impl std::fmt::Display for BackpressurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dispatch queue settings
///
/// All fields have sensible defaults - you only need to specify what you
/// want to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of queued dispatch jobs
    /// Default: 512
    pub capacity: usize,

    /// Behavior when the queue is full
    /// Default: "block"
    pub backpressure_policy: BackpressurePolicy,

    /// How long a producer waits for space under the "block" policy
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub enqueue_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 512,
            backpressure_policy: BackpressurePolicy::Block,
            enqueue_timeout: Duration::from_secs(5),
        }
    }
}
