//! Fanlog - Pipeline
//!
//! The bounded dispatch queue and the worker pool that drains it.
//!
//! # Architecture
//!
//! ```text
//! [Producers]                 [DispatchQueue]              [Workers]
//!    log() ──┐                                          ┌──→ console
//!    log() ──┼──→ enqueue ──→ VecDeque (bounded) ──→ deliver_job ──→ file cache
//!    log() ──┘    (tickets        FIFO                    │└──→ syslog
//!                  issued)                                └───→ plugin
//! ```
//!
//! # Key Design
//!
//! - **Thread-based**: plain `std::thread` workers over a mutex/condvar
//!   queue; producers never pay destination write latency for queued
//!   destinations
//! - **Backpressure**: a full queue blocks, evicts the oldest job, or
//!   rejects the newcomer, per configuration
//! - **Ticketed ordering**: gate tickets issued at enqueue time pin each
//!   record's write position per destination, so any number of workers
//!   preserve per-destination order
//! - **Late resolution**: jobs carry destination ids, not references;
//!   removal and quarantine take effect mid-flight
//! - **Shared write path**: the same [`Dispatcher`] serves queued jobs
//!   and direct (producer-thread) deliveries
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use fanlog_config::{QueueConfig, WorkerConfig};
//! use fanlog_pipeline::{DispatchQueue, Dispatcher, EngineMetrics, WorkerPool};
//! use fanlog_protocol::{Level, Levels, LogRecord};
//! use fanlog_registry::{DestinationRegistry, DestinationSpec};
//! use fanlog_sinks::{FileCache, NullSyslog};
//!
//! # fn main() -> fanlog_protocol::Result<()> {
//! let registry = Arc::new(DestinationRegistry::new(5));
//! let cache = Arc::new(FileCache::new(16, Duration::from_secs(1)));
//! let metrics = Arc::new(EngineMetrics::new());
//! let queue = Arc::new(DispatchQueue::new(&QueueConfig::default(), Arc::clone(&metrics)));
//! let dispatcher = Arc::new(Dispatcher::new(
//!     Arc::clone(&registry),
//!     cache,
//!     Arc::clone(&metrics),
//! ));
//!
//! let id = registry.register(
//!     DestinationSpec::syslog(Box::new(NullSyslog)).with_levels(Levels::all()),
//! )?;
//! let entry = registry.get(id).ok_or_else(|| {
//!     fanlog_protocol::Error::invalid_state("destination vanished")
//! })?;
//!
//! let pool = WorkerPool::spawn(
//!     &WorkerConfig::default(),
//!     Duration::from_secs(120),
//!     Arc::clone(&queue),
//!     dispatcher,
//! )?;
//!
//! queue.enqueue(LogRecord::new(Level::Info, "app", "hello"), &[entry])?;
//!
//! queue.close();
//! pool.join();
//! assert_eq!(metrics.snapshot().writes_ok, 1);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Modules
// =============================================================================

/// Dispatch jobs - one record bound to its queued targets
pub mod job;

/// Atomic counters for the dispatch path
pub mod metrics;

/// Bounded mutex/condvar FIFO between producers and workers
pub mod queue;

/// Delivery execution and the worker pool
pub mod worker;

// =============================================================================
// Public re-exports
// =============================================================================

pub use job::{DispatchJob, DispatchTarget};
pub use metrics::{DropTracker, EngineMetrics, EngineMetricsSnapshot};
pub use queue::{Dequeued, DispatchQueue};
pub use worker::{Dispatcher, WorkerPool};

// Tests are registered in their respective modules via #[cfg(test)]
// See: job.rs, metrics.rs, queue_test.rs, worker_test.rs
