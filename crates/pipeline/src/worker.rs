//! Delivery workers
//!
//! The [`Dispatcher`] turns a job into destination writes; the
//! [`WorkerPool`] runs that loop on a fixed set of threads. The same
//! write path serves direct destinations on the producer thread, so a
//! record renders and lands identically either way.
//!
//! Per job, each target is re-resolved by id right before its write. A
//! destination that was removed or quarantined after the job was queued
//! is skipped; the skipped gate ticket finishes on drop and later
//! writers proceed.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use fanlog_config::WorkerConfig;
use fanlog_protocol::{Error, LogRecord, OutputFlags, Result};
use fanlog_registry::{DestinationEntry, DestinationKind, DestinationRegistry};
use fanlog_sinks::{ConsoleStream, FileCache, RecordFormatter, TextFormatter};

use crate::job::{DispatchJob, DispatchTarget};
use crate::metrics::EngineMetrics;
use crate::queue::{Dequeued, DispatchQueue};

// =============================================================================
// Format memo
// =============================================================================

/// Per-job render cache
///
/// Destinations sharing a flag set and styling share one rendered string
/// instead of formatting the record again. The list stays tiny (one entry
/// per distinct flag set in the job), so a linear scan beats a map.
struct FormatMemo {
    rendered: Vec<(OutputFlags, bool, String)>,
}

impl FormatMemo {
    fn new() -> Self {
        Self {
            rendered: Vec::new(),
        }
    }

    fn render(
        &mut self,
        formatter: &TextFormatter,
        record: &LogRecord,
        flags: OutputFlags,
        styled: bool,
    ) -> &str {
        let pos = match self
            .rendered
            .iter()
            .position(|(f, s, _)| *f == flags && *s == styled)
        {
            Some(pos) => pos,
            None => {
                let text = formatter.format(record, flags, styled);
                self.rendered.push((flags, styled, text));
                self.rendered.len() - 1
            }
        };
        &self.rendered[pos].2
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Executes destination writes for jobs and direct deliveries
///
/// Shared by every worker thread and by producers writing direct
/// destinations. Holds no per-record state; rendering state lives in a
/// per-job [`FormatMemo`].
pub struct Dispatcher {
    registry: Arc<DestinationRegistry>,
    cache: Arc<FileCache>,
    formatter: TextFormatter,
    metrics: Arc<EngineMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher over the shared registry and file cache
    pub fn new(
        registry: Arc<DestinationRegistry>,
        cache: Arc<FileCache>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            registry,
            cache,
            formatter: TextFormatter::new(),
            metrics,
        }
    }

    /// Deliver a queued job to each of its remaining targets
    ///
    /// Writes happen in target order, each at its gate-reserved position.
    pub fn deliver_job(&self, job: DispatchJob) {
        let DispatchJob { record, targets } = job;
        let mut memo = FormatMemo::new();

        for DispatchTarget { id, ticket } in targets {
            let Some(entry) = self.registry.get(id) else {
                self.metrics.record_delivery_skipped();
                continue;
            };
            if entry.is_quarantined() {
                self.metrics.record_delivery_skipped();
                continue;
            }

            ticket.await_turn();
            // Re-check after taking the turn: the writer ahead of this job
            // may have tripped the quarantine while it waited.
            if entry.is_quarantined() {
                self.metrics.record_delivery_skipped();
                ticket.complete();
                continue;
            }
            let result = self.write_target(&record, &entry, &mut memo);
            // Record the outcome before releasing the turn, so the next
            // writer's quarantine check sees this attempt.
            self.finish_write(&entry, &result);
            ticket.complete();
        }

        self.metrics.record_dispatched();
    }

    /// Write one record to a direct destination on the calling thread
    ///
    /// Takes the destination's gate turn like any queued delivery, so
    /// direct and queued writes to the same destination stay ordered.
    pub fn deliver_direct(&self, record: &LogRecord, entry: &DestinationEntry) -> Result<()> {
        let ticket = entry.gate().issue();
        ticket.await_turn();
        // A retiring destination takes no further writes; skipping here lets
        // an unregister or shutdown drain finish promptly.
        if entry.is_quarantined() || entry.is_retiring() {
            self.metrics.record_delivery_skipped();
            ticket.complete();
            return Ok(());
        }
        let mut memo = FormatMemo::new();
        let result = self.write_target(record, entry, &mut memo);
        self.finish_write(entry, &result);
        ticket.complete();
        result
    }

    /// Close file handles that have sat unused past `idle_timeout`
    pub fn run_housekeeping(&self, idle_timeout: Duration) {
        let closed = self.cache.evict_idle(idle_timeout);
        if closed > 0 {
            debug!(closed, "closed idle file handles");
        }
    }

    fn write_target(
        &self,
        record: &LogRecord,
        entry: &DestinationEntry,
        memo: &mut FormatMemo,
    ) -> Result<()> {
        let flags = entry.flags();
        match entry.kind() {
            DestinationKind::ConsoleStdout => {
                let styled = !flags.contains(OutputFlags::NO_COLOR);
                let text = memo.render(&self.formatter, record, flags, styled);
                ConsoleStream::Stdout
                    .write(text)
                    .map_err(|e| Error::io("stdout", e))
            }
            DestinationKind::ConsoleStderr => {
                let styled = !flags.contains(OutputFlags::NO_COLOR);
                let text = memo.render(&self.formatter, record, flags, styled);
                ConsoleStream::Stderr
                    .write(text)
                    .map_err(|e| Error::io("stderr", e))
            }
            DestinationKind::File { path, options } => {
                let text = memo.render(&self.formatter, record, flags, false);
                let lease = self.cache.acquire(path, *options)?;
                lease.write(text)
            }
            // Syslog and plugin bindings frame their own records; they get
            // the line without its trailing newline.
            DestinationKind::Syslog(writer) => {
                let text = memo.render(&self.formatter, record, flags, false);
                writer
                    .write(record.level(), text.trim_end_matches('\n'))
                    .map_err(|e| Error::io(entry.name().to_string(), e))
            }
            DestinationKind::Plugin(sink) => {
                let text = memo.render(&self.formatter, record, flags, false);
                sink.write(record.level(), text.trim_end_matches('\n'))
            }
        }
    }

    fn finish_write(&self, entry: &DestinationEntry, result: &Result<()>) {
        match result {
            Ok(()) => {
                self.metrics.record_write_ok();
                self.registry.note_success(entry);
            }
            Err(e) => {
                self.metrics.record_write_failed();
                self.registry.note_failure(entry);
                warn!(
                    destination = %entry.name(),
                    kind = entry.kind().label(),
                    error = %e,
                    "destination write failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("cached_files", &self.cache.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Worker pool
// =============================================================================

/// Fixed set of delivery threads draining the dispatch queue
///
/// Workers run until the queue reports closed-and-empty, so joining the
/// pool after [`DispatchQueue::close`] flushes everything still queued.
pub struct WorkerPool {
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `config.count` workers (at least one)
    pub fn spawn(
        config: &WorkerConfig,
        cache_idle_timeout: Duration,
        queue: Arc<DispatchQueue>,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self> {
        let count = config.count.max(1);
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let queue_for_worker = Arc::clone(&queue);
            let dispatcher = Arc::clone(&dispatcher);
            let interval = config.housekeeping_interval;
            let spawned = thread::Builder::new()
                .name(format!("fanlog-worker-{index}"))
                .spawn(move || {
                    worker_loop(
                        index,
                        &queue_for_worker,
                        &dispatcher,
                        interval,
                        cache_idle_timeout,
                    )
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Release any workers already spawned before bailing.
                    queue.close();
                    return Err(Error::io("worker pool", e));
                }
            }
        }
        Ok(Self { handles })
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit
    ///
    /// Call after closing the queue; otherwise this blocks until someone
    /// else does.
    pub fn join(mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("dispatch worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.handles.len())
            .finish()
    }
}

fn worker_loop(
    index: usize,
    queue: &DispatchQueue,
    dispatcher: &Dispatcher,
    housekeeping_interval: Duration,
    cache_idle_timeout: Duration,
) {
    debug!(worker = index, "dispatch worker started");
    loop {
        match queue.dequeue(housekeeping_interval) {
            Dequeued::Job(job) => dispatcher.deliver_job(job),
            Dequeued::Idle => dispatcher.run_housekeeping(cache_idle_timeout),
            Dequeued::Closed => break,
        }
    }
    debug!(worker = index, "dispatch worker stopped");
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod worker_test;
