//! Engine assembly and the logging entry points
//!
//! [`Engine::new`] builds every component from one [`EngineConfig`] and
//! starts the worker pool; nothing is shared through globals. A failed
//! construction returns `Err` and leaves no partial engine behind.
//!
//! [`Engine::log`] snapshots the matching destinations once, then writes
//! direct destinations on the calling thread and enqueues one job covering
//! the queued remainder. Per-destination write failures never surface from
//! `log`: they are counted and diagnosed through `tracing`, and enough
//! consecutive failures quarantine the destination.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use fanlog_config::EngineConfig;
use fanlog_pipeline::{DispatchQueue, Dispatcher, EngineMetrics, EngineMetricsSnapshot, WorkerPool};
use fanlog_plugin::{LoadedPlugin, PluginSink};
use fanlog_protocol::{Error, Levels, LogRecord, Result};
use fanlog_registry::{
    DeliveryMode, DestinationEntry, DestinationId, DestinationKind, DestinationRegistry,
    DestinationSpec,
};
use fanlog_sinks::{CacheMetricsSnapshot, FileCache, FileOptions, SyslogWriter};

/// Bounded wait for a racing direct write when shutdown releases an entry
const SHUTDOWN_GATE_TIMEOUT: Duration = Duration::from_secs(1);

// =============================================================================
// Engine
// =============================================================================

/// The logging engine: registry, file cache, dispatch queue, worker pool
///
/// One `Engine` per configuration; share it across threads behind an `Arc`
/// (every method takes `&self`). Dropping the engine shuts it down if
/// [`Engine::shutdown`] was not already called.
pub struct Engine {
    registry: Arc<DestinationRegistry>,
    cache: Arc<FileCache>,
    metrics: Arc<EngineMetrics>,
    queue: Arc<DispatchQueue>,
    dispatcher: Arc<Dispatcher>,
    workers: Mutex<Option<WorkerPool>>,
    stopped: AtomicBool,
}

impl Engine {
    /// Build all components from `config` and start the workers
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation, or an
    /// I/O error if worker threads cannot be spawned.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(DestinationRegistry::new(config.quarantine_threshold));
        let cache = Arc::new(FileCache::new(
            config.cache.capacity,
            config.cache.acquire_timeout,
        ));
        let metrics = Arc::new(EngineMetrics::new());
        let queue = Arc::new(DispatchQueue::new(&config.queue, Arc::clone(&metrics)));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&metrics),
        ));
        let workers = WorkerPool::spawn(
            &config.workers,
            config.cache.idle_timeout,
            Arc::clone(&queue),
            Arc::clone(&dispatcher),
        )?;

        debug!(
            workers = workers.workers(),
            queue_capacity = config.queue.capacity,
            cache_capacity = config.cache.capacity,
            "engine started"
        );

        Ok(Self {
            registry,
            cache,
            metrics,
            queue,
            dispatcher,
            workers: Mutex::new(Some(workers)),
            stopped: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // Logging
    // =========================================================================

    /// Fan one record out to every destination whose filter admits its level
    ///
    /// Direct destinations are written on the calling thread; queued
    /// destinations share a single dispatch job. A record matching no
    /// destination is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` after shutdown, and the queue's backpressure
    /// error (`ResourceExhausted` or `QueueFull`, policy-dependent) when the
    /// dispatch queue cannot take the job. Write failures are never reported
    /// here.
    pub fn log(&self, record: LogRecord) -> Result<()> {
        self.ensure_running()?;
        self.metrics.record_submitted();

        let targets = self.registry.snapshot_matching(record.level());
        if targets.is_empty() {
            return Ok(());
        }

        let mut queued = Vec::with_capacity(targets.len());
        for entry in targets {
            match entry.delivery() {
                // Failures on the direct path are counted and diagnosed by
                // the dispatcher; the logging caller never sees them.
                DeliveryMode::Direct => {
                    let _ = self.dispatcher.deliver_direct(&record, &entry);
                }
                DeliveryMode::Queued => queued.push(entry),
            }
        }

        if queued.is_empty() {
            return Ok(());
        }
        self.queue.enqueue(record, &queued)
    }

    // =========================================================================
    // Destination management
    // =========================================================================

    /// Register a destination from a full spec
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty level filter, a duplicate
    /// console destination, an unwritable file path, or a full table.
    pub fn register(&self, spec: DestinationSpec) -> Result<DestinationId> {
        self.ensure_running()?;
        self.registry.register(spec)
    }

    /// Register the process stdout console destination
    pub fn register_stdout(&self) -> Result<DestinationId> {
        self.register(DestinationSpec::console_stdout())
    }

    /// Register the process stderr console destination
    pub fn register_stderr(&self) -> Result<DestinationId> {
        self.register(DestinationSpec::console_stderr())
    }

    /// Register an append-mode file destination with default options
    pub fn register_file(&self, path: impl Into<PathBuf>) -> Result<DestinationId> {
        self.register(DestinationSpec::file(path))
    }

    /// Register a file destination with explicit open and rotation options
    pub fn register_file_with_options(
        &self,
        path: impl Into<PathBuf>,
        options: FileOptions,
    ) -> Result<DestinationId> {
        self.register(DestinationSpec::file_with_options(path, options))
    }

    /// Register a syslog destination backed by `writer`
    pub fn register_syslog(&self, writer: Box<dyn SyslogWriter>) -> Result<DestinationId> {
        self.register(DestinationSpec::syslog(writer))
    }

    /// Load the shared library at `path` and register it as a plugin sink
    ///
    /// # Errors
    ///
    /// Returns `IncompatiblePlugin` when the library is missing the entry
    /// symbol, reports the wrong ABI version, or exports an invalid table.
    pub fn register_plugin(&self, path: &Path) -> Result<DestinationId> {
        self.ensure_running()?;
        let plugin = LoadedPlugin::load(path)?;
        self.registry
            .register(DestinationSpec::plugin(Box::new(plugin)))
    }

    /// Register an in-process plugin sink without loading a library
    pub fn register_plugin_sink(&self, sink: Box<dyn PluginSink>) -> Result<DestinationId> {
        self.register(DestinationSpec::plugin(sink))
    }

    /// Remove a destination after draining its in-flight writes
    ///
    /// Waits up to `drain_timeout` for writes already holding the
    /// destination's gate. On success the destination's resources are
    /// released: file destinations give up their cached handle, plugin
    /// destinations get their teardown call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for an unknown id or one already being
    /// removed, and `Timeout` when in-flight writes do not drain in time
    /// (the destination then stays registered and active).
    pub fn unregister(&self, id: DestinationId, drain_timeout: Duration) -> Result<()> {
        self.ensure_running()?;
        let entry = self.registry.unregister(id, drain_timeout)?;
        self.release(&entry);
        Ok(())
    }

    /// Replace a destination's level filter
    ///
    /// Takes effect for the next snapshot; jobs already enqueued keep their
    /// targets.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty filter, `InvalidState` for an
    /// unknown id.
    pub fn update_levels(&self, id: DestinationId, levels: Levels) -> Result<()> {
        self.ensure_running()?;
        self.registry.update_levels(id, levels)
    }

    // =========================================================================
    // Introspection and shutdown
    // =========================================================================

    /// Point-in-time counters across the pipeline, cache, and registry
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            pipeline: self.metrics.snapshot(),
            cache: self.cache.metrics(),
            destinations: self.registry.len(),
            quarantined: self.registry.quarantined_count(),
        }
    }

    /// Whether the engine still accepts records
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// Stop the workers once the queue drains, then release every destination
    ///
    /// Jobs already enqueued are delivered before the workers exit; no job
    /// is lost or interrupted mid-write. Idempotent: the second and later
    /// calls return immediately.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.queue.close();
        if let Some(pool) = self.workers.lock().take() {
            pool.join();
        }

        for entry in self.registry.clear() {
            // Racing direct writers skip retired entries, so the gate
            // settles quickly.
            let _ = entry.gate().drain(SHUTDOWN_GATE_TIMEOUT);
            self.release(&entry);
        }
        self.cache.close_all();

        let snapshot = self.metrics.snapshot();
        debug!(
            dispatched = snapshot.jobs_dispatched,
            writes_ok = snapshot.writes_ok,
            writes_failed = snapshot.writes_failed,
            "engine stopped"
        );
    }

    // =========================================================================
    // Internals
    // =========================================================================

    #[inline]
    fn ensure_running(&self) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(Error::invalid_state("engine is shut down"));
        }
        Ok(())
    }

    /// Release resources tied to a removed destination
    ///
    /// Runs only after the entry's gate has drained, so no write is in
    /// flight when a plugin's teardown fires or a cached handle closes.
    fn release(&self, entry: &DestinationEntry) {
        match entry.kind() {
            DestinationKind::File { path, .. } => {
                self.cache.remove(path);
            }
            DestinationKind::Plugin(sink) => sink.teardown(),
            _ => {}
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("destinations", &self.registry.len())
            .field("queue_depth", &self.queue.len())
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// EngineStats
// =============================================================================

/// Combined snapshot returned by [`Engine::stats`]
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    /// Dispatch pipeline counters (queue depth, jobs, writes)
    pub pipeline: EngineMetricsSnapshot,
    /// Open-file cache counters (opens, hits, evictions, rolls)
    pub cache: CacheMetricsSnapshot,
    /// Destinations currently registered
    pub destinations: usize,
    /// Destinations currently quarantined
    pub quarantined: usize,
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
