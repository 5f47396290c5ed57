//! Engine error taxonomy
//!
//! One error type shared by every component. Destination-local write
//! failures are counted and reported through the diagnostic channel rather
//! than raised to logging callers; the variants here surface from the
//! operations that can fail synchronously (registration, configuration,
//! capacity waits, plugin loading, lifecycle misuse).

use thiserror::Error;

/// Errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected registration or configuration input; nothing was mutated
    #[error("invalid configuration for {what}: {reason}")]
    InvalidConfig {
        /// What was being configured
        what: String,
        /// Why it was rejected
        reason: String,
    },

    /// A bounded resource stayed at capacity past the blocking timeout
    #[error("{resource} exhausted after waiting {waited_ms}ms")]
    ResourceExhausted {
        /// Which resource was at capacity
        resource: &'static str,
        /// How long the caller waited before giving up
        waited_ms: u64,
    },

    /// Non-blocking backpressure policy rejected an incoming job
    #[error("dispatch queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// Per-open or per-write failure on one destination
    #[error("I/O failure on {target}: {source}")]
    Io {
        /// Destination or path the operation targeted
        target: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Plugin module failed ABI or capability validation
    #[error("incompatible plugin {path}: {reason}")]
    IncompatiblePlugin {
        /// Module path as given to the loader
        path: String,
        /// Version or signature mismatch detail
        reason: String,
    },

    /// A bounded wait (such as unregister drain) exceeded its deadline
    #[error("timed out after {waited_ms}ms waiting for {operation}")]
    Timeout {
        /// The operation that was being waited on
        operation: &'static str,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// API misuse such as releasing a latch nobody holds
    #[error("invalid state: {reason}")]
    InvalidState {
        /// What was wrong
        reason: String,
    },
}

impl Error {
    /// Create an InvalidConfig error
    #[inline]
    pub fn invalid_config(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create a ResourceExhausted error
    #[inline]
    pub fn exhausted(resource: &'static str, waited: std::time::Duration) -> Self {
        Self::ResourceExhausted {
            resource,
            waited_ms: waited.as_millis() as u64,
        }
    }

    /// Create a QueueFull error
    #[inline]
    pub fn queue_full(capacity: usize) -> Self {
        Self::QueueFull { capacity }
    }

    /// Create an Io error
    #[inline]
    pub fn io(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            target: target.into(),
            source,
        }
    }

    /// Create an IncompatiblePlugin error
    #[inline]
    pub fn incompatible_plugin(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IncompatiblePlugin {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a Timeout error
    #[inline]
    pub fn timeout(operation: &'static str, waited: std::time::Duration) -> Self {
        Self::Timeout {
            operation,
            waited_ms: waited.as_millis() as u64,
        }
    }

    /// Create an InvalidState error
    #[inline]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
