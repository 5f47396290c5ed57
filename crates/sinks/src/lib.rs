//! Fanlog - Sinks
//!
//! Output backends for fanlog destinations, plus the shared text formatter.
//!
//! # Architecture
//!
//! Workers (or producers, for direct destinations) hand each formatted
//! record to the backend that matches the destination kind. File writes go
//! through a bounded [`FileCache`] of open handles so any number of file
//! destinations share a fixed pool of open descriptors.
//!
//! ```text
//! [LogRecord] --format--> [text] --> console stream
//!                                --> file cache lease
//!                                --> syslog writer
//! ```
//!
//! # Available Backends
//!
//! | Backend | Purpose | Cached |
//! |---------|---------|--------|
//! | `console` | stdout / stderr streams | No |
//! | `file_cache` | append-mode log files with rotation | Yes |
//! | `syslog` | host syslog facility | No |
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use fanlog_sinks::{FileCache, FileOptions};
//!
//! # fn main() -> fanlog_protocol::Result<()> {
//! let cache = FileCache::new(16, Duration::from_secs(1));
//! let lease = cache.acquire(Path::new("app.log"), FileOptions::appending())?;
//! lease.write("12:00:00.000 [100:1] info      app: started\n")?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Backends (each in its own submodule)
// =============================================================================

/// Console backend - locked stdout / stderr writes
pub mod console;

/// File backend - bounded cache of open handles with rotation
pub mod file_cache;

/// Syslog backend - pluggable writer boundary
pub mod syslog;

// =============================================================================
// Formatting
// =============================================================================

/// Record-to-text formatting with per-destination field suppression
pub mod format;

// =============================================================================
// Public re-exports
// =============================================================================

pub use console::ConsoleStream;
pub use file_cache::{
    CacheMetrics, CacheMetricsSnapshot, FileCache, FileEntry, FileLease, FileOptions, OpenMode,
    RotationPolicy, DEFAULT_ROLL_SIZE,
};
pub use format::{level_style, RecordFormatter, TextFormatter};
pub use syslog::{NullSyslog, SyslogWriter};

// Tests are registered in their respective modules via #[cfg(test)]
// See: console.rs, file_cache_test.rs, format.rs, syslog.rs
