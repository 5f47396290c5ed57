//! System log boundary
//!
//! The engine treats the OS syslog/event-log binding as an external
//! collaborator behind a single-call interface. Failures from the binding
//! are handled exactly like file I/O failures: counted against the
//! destination, never raised to the logging caller.

use fanlog_protocol::Level;

/// A binding to the platform system log
///
/// Implementations map [`Level`] onto the platform's priority scheme and
/// submit one message per call. The engine never batches or retries at
/// this boundary.
pub trait SyslogWriter: Send + Sync {
    /// Submit one message to the system log
    fn write(&self, level: Level, message: &str) -> std::io::Result<()>;

    /// Name used in diagnostics for this binding
    fn name(&self) -> &str {
        "syslog"
    }
}

/// Discards everything; stands in where no platform binding is wired
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSyslog;

impl SyslogWriter for NullSyslog {
    fn write(&self, _level: Level, _message: &str) -> std::io::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null-syslog"
    }
}
