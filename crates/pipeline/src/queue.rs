//! Bounded dispatch queue
//!
//! A mutex-and-condvar FIFO between producers and the worker pool. The
//! capacity bound is what turns sustained overload into backpressure (or
//! controlled loss) instead of unbounded memory growth.
//!
//! Gate tickets for a job are issued inside the queue lock, in the same
//! critical section that inserts the job. Two jobs therefore take their
//! ticket sets in a total order, which is the property the delivery gates
//! need to keep the pool deadlock-free; see `fanlog_registry::gate`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use fanlog_config::{BackpressurePolicy, QueueConfig};
use fanlog_protocol::{Error, LogRecord, Result};
use fanlog_registry::DestinationEntry;

use crate::job::{DispatchJob, DispatchTarget};
use crate::metrics::{DropTracker, EngineMetrics};

/// What a worker got back from [`DispatchQueue::dequeue`]
#[derive(Debug)]
pub enum Dequeued {
    /// A job to deliver
    Job(DispatchJob),
    /// Nothing arrived within the wait window; run housekeeping
    Idle,
    /// The queue is closed and fully drained; the worker should exit
    Closed,
}

struct QueueState {
    jobs: VecDeque<DispatchJob>,
    closed: bool,
}

/// Thread-safe bounded FIFO of dispatch jobs
///
/// Producers enqueue under the configured backpressure policy; workers
/// dequeue with a timeout so they can run housekeeping while idle.
/// Closing stops intake immediately but lets workers drain what is
/// already queued.
pub struct DispatchQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    policy: BackpressurePolicy,
    enqueue_timeout: Duration,
    metrics: Arc<EngineMetrics>,
    drop_tracker: DropTracker,
}

impl DispatchQueue {
    /// Create a queue sized and behaved per the config
    pub fn new(config: &QueueConfig, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::with_capacity(config.capacity.min(1024)),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: config.capacity,
            policy: config.backpressure_policy,
            enqueue_timeout: config.enqueue_timeout,
            metrics,
            drop_tracker: DropTracker::new(),
        }
    }

    /// Queue one record for delivery to `targets`
    ///
    /// Issues a gate ticket per target and inserts the job, all under one
    /// lock hold. On a full queue the configured policy decides: `Block`
    /// waits up to the enqueue timeout and then fails with
    /// `ResourceExhausted`; `DropOldest` evicts the queue head to make
    /// room; `DropNewest` fails with `QueueFull` and queues nothing.
    pub fn enqueue(&self, record: LogRecord, targets: &[Arc<DestinationEntry>]) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::invalid_state("dispatch queue is closed"));
        }

        if state.jobs.len() >= self.capacity {
            match self.policy {
                BackpressurePolicy::Block => {
                    let deadline = Instant::now() + self.enqueue_timeout;
                    while state.jobs.len() >= self.capacity && !state.closed {
                        if self.not_full.wait_until(&mut state, deadline).timed_out() {
                            break;
                        }
                    }
                    if state.closed {
                        return Err(Error::invalid_state("dispatch queue is closed"));
                    }
                    if state.jobs.len() >= self.capacity {
                        self.metrics.record_enqueue_timeout();
                        return Err(Error::exhausted("dispatch queue", self.enqueue_timeout));
                    }
                }
                BackpressurePolicy::DropOldest => {
                    if let Some(evicted) = state.jobs.pop_front() {
                        self.metrics.record_dropped_oldest();
                        self.metrics.record_dequeued();
                        self.drop_tracker.record_drop(evicted.targets.len() as u64);
                        // Dropping the job finishes its tickets, so the
                        // evicted positions never block later writers.
                        drop(evicted);
                    }
                }
                BackpressurePolicy::DropNewest => {
                    self.metrics.record_rejected();
                    return Err(Error::queue_full(self.capacity));
                }
            }
        }

        // Tickets and queue position are taken in one critical section so
        // every queued job's tickets are totally ordered at every gate.
        let targets = targets
            .iter()
            .map(|entry| DispatchTarget {
                id: entry.id(),
                ticket: entry.gate().issue(),
            })
            .collect();
        state.jobs.push_back(DispatchJob { record, targets });
        self.metrics.record_enqueued();
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the next job, waiting up to `idle_timeout` for one to arrive
    ///
    /// Returns [`Dequeued::Idle`] on timeout and [`Dequeued::Closed`] only
    /// once the queue is both closed and empty, so pending jobs drain
    /// through shutdown.
    pub fn dequeue(&self, idle_timeout: Duration) -> Dequeued {
        let mut state = self.state.lock();
        let deadline = Instant::now() + idle_timeout;
        loop {
            if let Some(job) = state.jobs.pop_front() {
                self.metrics.record_dequeued();
                self.not_full.notify_one();
                return Dequeued::Job(job);
            }
            if state.closed {
                return Dequeued::Closed;
            }
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                return match state.jobs.pop_front() {
                    Some(job) => {
                        self.metrics.record_dequeued();
                        self.not_full.notify_one();
                        Dequeued::Job(job)
                    }
                    None if state.closed => Dequeued::Closed,
                    None => Dequeued::Idle,
                };
            }
        }
    }

    /// Stop intake; queued jobs remain for workers to drain
    ///
    /// Producers blocked on a full queue wake and fail with
    /// `InvalidState`. Safe to call more than once.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let pending = state.jobs.len();
        drop(state);

        debug!(pending, "dispatch queue closed");
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Jobs currently queued
    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured capacity bound
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DispatchQueue")
            .field("len", &state.jobs.len())
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
