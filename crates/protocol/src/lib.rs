//! Fanlog protocol - core types shared across the engine
//!
//! This crate provides the foundational types that flow through the engine:
//! - `LogRecord` - One immutable leveled message with origin metadata
//! - `Level` / `Levels` - Ordered severity and per-destination filter masks
//! - `OutputFlags` - Per-destination formatting switches
//! - `Error` / `Result` - The engine-wide error taxonomy
//!
//! # Design Principles
//!
//! - **Immutable records**: A record never changes after construction, so
//!   workers and destinations can share it without coordination
//! - **Copy-sized filters**: Levels and flags are plain bitmasks, cheap to
//!   snapshot on every logging call
//! - **One taxonomy**: Every component reports through the same `Error`

mod error;
mod flags;
mod level;
mod record;

pub use error::{Error, Result};
pub use flags::OutputFlags;
pub use level::{Level, Levels};
pub use record::{current_thread_id, LogRecord, StyleHint};

/// Default number of consecutive failures before a destination is quarantined
pub const DEFAULT_QUARANTINE_THRESHOLD: u32 = 5;
