//! Fanlog - Structured multi-destination logging engine
//!
//! Application code emits a leveled record once; the engine fans it out to
//! every registered destination: console streams, append-only files with
//! size-based rolling, a syslog binding, and dynamically loaded plugin
//! sinks. Producers never block on sink I/O, only on queue backpressure,
//! and a failing destination is quarantined instead of starving the
//! healthy ones.
//!
//! # Architecture
//!
//! ```text
//!  application threads
//!        | log() / emit macros
//!        v
//!  +--------+  level snapshot  +---------------------+
//!  | Engine | ---------------> | DestinationRegistry |
//!  +--------+                  +---------------------+
//!        |                                |
//!        | direct (console)               | queued targets + gate tickets
//!        v                                v
//!   console writes                +---------------+
//!                                 | DispatchQueue |  bounded, policy-driven
//!                                 +---------------+
//!                                         |
//!                                    worker pool
//!                                         |
//!                     file cache / syslog binding / plugin sinks
//! ```
//!
//! # Quick Start
//!
//! ```
//! use fanlog::{DestinationSpec, Engine, EngineConfig, Level, Levels};
//!
//! # fn main() -> fanlog::Result<()> {
//! let engine = Engine::new(EngineConfig::default())?;
//! let console = engine.register(DestinationSpec::console_stdout())?;
//!
//! fanlog::info!(engine, "online with {} destination(s)", 1)?;
//!
//! // Tighten the console filter at runtime.
//! engine.update_levels(console, Levels::at_or_above(Level::Warning))?;
//! fanlog::warning!(engine, "disk usage above {}%", 90)?;
//!
//! engine.shutdown();
//! # Ok(())
//! # }
//! ```

mod engine;
mod macros;

pub use engine::{Engine, EngineStats};

pub use fanlog_config::{BackpressurePolicy, CacheConfig, EngineConfig, QueueConfig, WorkerConfig};
pub use fanlog_pipeline::EngineMetricsSnapshot;
pub use fanlog_plugin::{LoadedPlugin, PluginInfo, PluginSink};
pub use fanlog_protocol::{
    Error, Level, Levels, LogRecord, OutputFlags, Result, StyleHint, DEFAULT_QUARANTINE_THRESHOLD,
};
pub use fanlog_registry::{DeliveryMode, DestinationId, DestinationKind, DestinationSpec};
pub use fanlog_sinks::{
    CacheMetricsSnapshot, FileOptions, NullSyslog, OpenMode, RecordFormatter, RotationPolicy,
    SyslogWriter, TextFormatter,
};

// Engine unit tests live in src/engine_test.rs; end-to-end scenarios in
// tests/smoke_test.rs.
