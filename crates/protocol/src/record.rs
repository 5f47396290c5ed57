//! Log record: the unit that flows through the engine
//!
//! A record is immutable after construction. The producer owns it until it
//! is handed to the dispatch queue; from then on the queue and the worker
//! that dequeues it own it until delivery completes.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::level::Level;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

std::thread_local! {
    // std's ThreadId exposes no stable integer, so assign our own
    // sequential id the first time a thread creates a record.
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Numeric id of the calling thread, stable for the thread's lifetime
#[inline]
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// Rendering hint attached by the producer, consumed by console formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleHint {
    /// Style by level (the per-level color table)
    #[default]
    Default,
    /// Never style, even on color-capable consoles
    Plain,
    /// Emphasize regardless of level
    Highlight,
}

/// One leveled log message with its origin metadata
///
/// Construction captures the timestamp, process id, and calling thread id;
/// nothing is re-read at delivery time, so a record renders identically no
/// matter which worker writes it or when.
#[derive(Debug, Clone)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    level: Level,
    name: String,
    message: String,
    style: StyleHint,
    pid: u32,
    tid: u64,
}

impl LogRecord {
    /// Build a record stamped with the current time and calling thread
    pub fn new(level: Level, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            name: name.into(),
            message: message.into(),
            style: StyleHint::Default,
            pid: std::process::id(),
            tid: current_thread_id(),
        }
    }

    /// Replace the style hint
    #[must_use]
    pub fn with_style(mut self, style: StyleHint) -> Self {
        self.style = style;
        self
    }

    /// Replace the captured timestamp (replay and testing)
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// When the record was created
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Severity of the record
    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Originating subsystem name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formatted message body
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Producer-supplied rendering hint
    #[inline]
    pub fn style(&self) -> StyleHint {
        self.style
    }

    /// Process id captured at construction
    #[inline]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Thread id captured at construction
    #[inline]
    pub fn tid(&self) -> u64 {
        self.tid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_captures_origin() {
        let record = LogRecord::new(Level::Info, "net", "listener up");
        assert_eq!(record.level(), Level::Info);
        assert_eq!(record.name(), "net");
        assert_eq!(record.message(), "listener up");
        assert_eq!(record.pid(), std::process::id());
        assert_eq!(record.tid(), current_thread_id());
        assert_eq!(record.style(), StyleHint::Default);
    }

    #[test]
    fn test_with_style() {
        let record = LogRecord::new(Level::Debug, "core", "x").with_style(StyleHint::Plain);
        assert_eq!(record.style(), StyleHint::Plain);
    }

    #[test]
    fn test_with_timestamp() {
        let ts = "2026-01-05T10:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let record = LogRecord::new(Level::Error, "db", "query failed").with_timestamp(ts);
        assert_eq!(record.timestamp(), ts);
    }

    #[test]
    fn test_thread_ids_differ_across_threads() {
        let here = current_thread_id();
        let there = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_thread_id_stable_within_thread() {
        assert_eq!(current_thread_id(), current_thread_id());
    }
}
