//! Engine metrics
//!
//! Atomic counters for the dispatch path.
//! All operations use relaxed ordering; values are eventually consistent,
//! not real-time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the dispatch queue and worker pool
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently.
/// The atomic operations ensure no data races, though values may be
/// slightly stale when read.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Records accepted by a log call (direct and queued alike)
    records_submitted: AtomicU64,

    /// Jobs placed on the dispatch queue
    jobs_enqueued: AtomicU64,

    /// Jobs fully processed by a worker
    jobs_dispatched: AtomicU64,

    /// Jobs evicted from the queue head under the drop-oldest policy
    jobs_dropped_oldest: AtomicU64,

    /// Jobs rejected outright under the drop-newest policy
    jobs_rejected: AtomicU64,

    /// Producers that gave up waiting for queue space under the block policy
    enqueue_timeouts: AtomicU64,

    /// Deliveries skipped because the destination was gone or quarantined
    /// by the time a worker reached it
    deliveries_skipped: AtomicU64,

    /// Individual destination writes that succeeded
    writes_ok: AtomicU64,

    /// Individual destination writes that failed
    writes_failed: AtomicU64,

    /// Jobs currently sitting in the queue
    queue_depth: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            records_submitted: AtomicU64::new(0),
            jobs_enqueued: AtomicU64::new(0),
            jobs_dispatched: AtomicU64::new(0),
            jobs_dropped_oldest: AtomicU64::new(0),
            jobs_rejected: AtomicU64::new(0),
            enqueue_timeouts: AtomicU64::new(0),
            deliveries_skipped: AtomicU64::new(0),
            writes_ok: AtomicU64::new(0),
            writes_failed: AtomicU64::new(0),
            queue_depth: AtomicU64::new(0),
        }
    }

    /// Record a log call that passed level filtering
    #[inline]
    pub fn record_submitted(&self) {
        self.records_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job entering the queue
    #[inline]
    pub fn record_enqueued(&self) {
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job leaving the queue, by dequeue or eviction
    #[inline]
    pub fn record_dequeued(&self) {
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a job a worker finished processing
    #[inline]
    pub fn record_dispatched(&self) {
        self.jobs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a queue-head eviction under drop-oldest
    #[inline]
    pub fn record_dropped_oldest(&self) {
        self.jobs_dropped_oldest.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an incoming job rejected under drop-newest
    #[inline]
    pub fn record_rejected(&self) {
        self.jobs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a producer timing out while blocked on a full queue
    #[inline]
    pub fn record_enqueue_timeout(&self) {
        self.enqueue_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivery skipped at resolve time
    #[inline]
    pub fn record_delivery_skipped(&self) {
        self.deliveries_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful destination write
    #[inline]
    pub fn record_write_ok(&self) {
        self.writes_ok.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed destination write
    #[inline]
    pub fn record_write_failed(&self) {
        self.writes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    ///
    /// Returns a point-in-time copy of all counters.
    #[inline]
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            records_submitted: self.records_submitted.load(Ordering::Relaxed),
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            jobs_dispatched: self.jobs_dispatched.load(Ordering::Relaxed),
            jobs_dropped_oldest: self.jobs_dropped_oldest.load(Ordering::Relaxed),
            jobs_rejected: self.jobs_rejected.load(Ordering::Relaxed),
            enqueue_timeouts: self.enqueue_timeouts.load(Ordering::Relaxed),
            deliveries_skipped: self.deliveries_skipped.load(Ordering::Relaxed),
            writes_ok: self.writes_ok.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    ///
    /// Useful for testing or periodic metric collection.
    pub fn reset(&self) {
        self.records_submitted.store(0, Ordering::Relaxed);
        self.jobs_enqueued.store(0, Ordering::Relaxed);
        self.jobs_dispatched.store(0, Ordering::Relaxed);
        self.jobs_dropped_oldest.store(0, Ordering::Relaxed);
        self.jobs_rejected.store(0, Ordering::Relaxed);
        self.enqueue_timeouts.store(0, Ordering::Relaxed);
        self.deliveries_skipped.store(0, Ordering::Relaxed);
        self.writes_ok.store(0, Ordering::Relaxed);
        self.writes_failed.store(0, Ordering::Relaxed);
        self.queue_depth.store(0, Ordering::Relaxed);
    }

    // Direct accessors for individual metrics (for logging)

    /// Get jobs dispatched count
    #[inline]
    pub fn jobs_dispatched(&self) -> u64 {
        self.jobs_dispatched.load(Ordering::Relaxed)
    }

    /// Get queue-head eviction count
    #[inline]
    pub fn jobs_dropped_oldest(&self) -> u64 {
        self.jobs_dropped_oldest.load(Ordering::Relaxed)
    }

    /// Get failed write count
    #[inline]
    pub fn writes_failed(&self) -> u64 {
        self.writes_failed.load(Ordering::Relaxed)
    }

    /// Get current queue depth
    #[inline]
    pub fn queue_depth(&self) -> u64 {
        self.queue_depth.load(Ordering::Relaxed)
    }
}

/// Point-in-time snapshot of engine metrics
///
/// This is a simple struct that can be copied, compared, and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineMetricsSnapshot {
    /// Records accepted by a log call
    pub records_submitted: u64,
    /// Jobs placed on the dispatch queue
    pub jobs_enqueued: u64,
    /// Jobs fully processed by a worker
    pub jobs_dispatched: u64,
    /// Jobs evicted under drop-oldest
    pub jobs_dropped_oldest: u64,
    /// Jobs rejected under drop-newest
    pub jobs_rejected: u64,
    /// Enqueue attempts that timed out waiting for space
    pub enqueue_timeouts: u64,
    /// Deliveries skipped at resolve time
    pub deliveries_skipped: u64,
    /// Destination writes that succeeded
    pub writes_ok: u64,
    /// Destination writes that failed
    pub writes_failed: u64,
    /// Jobs currently queued
    pub queue_depth: u64,
}

impl EngineMetricsSnapshot {
    /// Calculate write success rate (0.0 - 1.0)
    ///
    /// Returns None if no writes have been attempted.
    #[inline]
    pub fn write_success_rate(&self) -> Option<f64> {
        let total = self.writes_ok + self.writes_failed;
        if total == 0 {
            None
        } else {
            Some(self.writes_ok as f64 / total as f64)
        }
    }

    /// Calculate the difference from another snapshot
    ///
    /// Useful for calculating rates over time intervals.
    #[inline]
    pub fn diff(&self, previous: &EngineMetricsSnapshot) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            records_submitted: self
                .records_submitted
                .saturating_sub(previous.records_submitted),
            jobs_enqueued: self.jobs_enqueued.saturating_sub(previous.jobs_enqueued),
            jobs_dispatched: self
                .jobs_dispatched
                .saturating_sub(previous.jobs_dispatched),
            jobs_dropped_oldest: self
                .jobs_dropped_oldest
                .saturating_sub(previous.jobs_dropped_oldest),
            jobs_rejected: self.jobs_rejected.saturating_sub(previous.jobs_rejected),
            enqueue_timeouts: self
                .enqueue_timeouts
                .saturating_sub(previous.enqueue_timeouts),
            deliveries_skipped: self
                .deliveries_skipped
                .saturating_sub(previous.deliveries_skipped),
            writes_ok: self.writes_ok.saturating_sub(previous.writes_ok),
            writes_failed: self.writes_failed.saturating_sub(previous.writes_failed),
            // Depth is a gauge, not a counter; carry the current value.
            queue_depth: self.queue_depth,
        }
    }
}

// ============================================================================
// Drop Tracker - Rate-limited eviction logging for production visibility
// ============================================================================

/// Rate-limited eviction logging
///
/// Aggregates drop-oldest evictions and logs a summary every second
/// instead of per-event logging. This prevents log spam while ensuring
/// operators see sustained overload.
///
/// # Thresholds
///
/// - >0 evictions/sec: WARN level
/// - >100 evictions/sec: ERROR level (critical - workers can't keep up)
///
/// # Thread Safety
///
/// All operations use atomics and are safe for concurrent access.
pub struct DropTracker {
    /// Evictions in current interval
    interval_drops: AtomicU64,
    /// Deliveries lost with them in current interval
    interval_deliveries: AtomicU64,
    /// Last log time (epoch milliseconds)
    last_log_ms: AtomicU64,
}

/// Log interval in milliseconds
const LOG_INTERVAL_MS: u64 = 1000;
/// Critical threshold - evictions/sec that triggers ERROR level
const CRITICAL_DROP_THRESHOLD: u64 = 100;

impl DropTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        Self {
            interval_drops: AtomicU64::new(0),
            interval_deliveries: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(Self::now_ms()),
        }
    }

    /// Record an eviction and check if we should log
    ///
    /// Call this when a job is evicted from the queue head.
    /// Returns true if a log was emitted.
    pub fn record_drop(&self, delivery_count: u64) -> bool {
        self.interval_drops.fetch_add(1, Ordering::Relaxed);
        self.interval_deliveries
            .fetch_add(delivery_count, Ordering::Relaxed);

        self.maybe_log()
    }

    /// Check if we should log and emit if so
    ///
    /// Returns true if a log was emitted.
    fn maybe_log(&self) -> bool {
        let now = Self::now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);

        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // Try to claim the log slot (avoid duplicate logs from concurrent calls)
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        // Swap out the counters
        let drops = self.interval_drops.swap(0, Ordering::Relaxed);
        let deliveries = self.interval_deliveries.swap(0, Ordering::Relaxed);

        if drops == 0 {
            return false;
        }

        // Log at appropriate level
        if drops > CRITICAL_DROP_THRESHOLD {
            tracing::error!(
                evicted_jobs = drops,
                lost_deliveries = deliveries,
                threshold = CRITICAL_DROP_THRESHOLD,
                "CRITICAL: sustained queue overflow - workers cannot keep up"
            );
        } else {
            tracing::warn!(
                evicted_jobs = drops,
                lost_deliveries = deliveries,
                "queue overflow: oldest jobs evicted in last second"
            );
        }

        true
    }

    /// Get current epoch milliseconds
    #[inline]
    fn now_ms() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Get the current eviction count (for testing)
    #[cfg(test)]
    pub fn current_drops(&self) -> u64 {
        self.interval_drops.load(Ordering::Relaxed)
    }
}

impl Default for DropTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DropTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropTracker")
            .field(
                "interval_drops",
                &self.interval_drops.load(Ordering::Relaxed),
            )
            .field(
                "interval_deliveries",
                &self.interval_deliveries.load(Ordering::Relaxed),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // DropTracker Tests
    // ========================================================================

    #[test]
    fn test_drop_tracker_new() {
        let tracker = DropTracker::new();
        assert_eq!(tracker.current_drops(), 0);
    }

    #[test]
    fn test_drop_tracker_record_drop() {
        let tracker = DropTracker::new();

        // Record drops (won't log yet - not enough time elapsed)
        tracker.record_drop(2);
        tracker.record_drop(3);

        assert_eq!(tracker.current_drops(), 2);
    }

    #[test]
    fn test_drop_tracker_debug() {
        let tracker = DropTracker::new();
        tracker.record_drop(5);

        let debug = format!("{:?}", tracker);
        assert!(debug.contains("DropTracker"));
        assert!(debug.contains("interval_drops"));
    }

    // ========================================================================
    // EngineMetrics Tests
    // ========================================================================

    #[test]
    fn test_metrics_new() {
        let metrics = EngineMetrics::new();
        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.records_submitted, 0);
        assert_eq!(snapshot.jobs_enqueued, 0);
        assert_eq!(snapshot.writes_ok, 0);
        assert_eq!(snapshot.queue_depth, 0);
    }

    #[test]
    fn test_queue_depth_tracks_enqueue_dequeue() {
        let metrics = EngineMetrics::new();

        metrics.record_enqueued();
        metrics.record_enqueued();
        metrics.record_enqueued();
        assert_eq!(metrics.queue_depth(), 3);

        metrics.record_dequeued();
        assert_eq!(metrics.queue_depth(), 2);
        assert_eq!(metrics.snapshot().jobs_enqueued, 3);
    }

    #[test]
    fn test_record_writes() {
        let metrics = EngineMetrics::new();

        metrics.record_write_ok();
        metrics.record_write_ok();
        metrics.record_write_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.writes_ok, 2);
        assert_eq!(snapshot.writes_failed, 1);
        assert_eq!(metrics.writes_failed(), 1);
    }

    #[test]
    fn test_record_drops_and_rejections() {
        let metrics = EngineMetrics::new();

        metrics.record_dropped_oldest();
        metrics.record_rejected();
        metrics.record_rejected();
        metrics.record_enqueue_timeout();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_dropped_oldest, 1);
        assert_eq!(snapshot.jobs_rejected, 2);
        assert_eq!(snapshot.enqueue_timeouts, 1);
        assert_eq!(metrics.jobs_dropped_oldest(), 1);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = EngineMetrics::new();

        metrics.record_submitted();
        metrics.record_enqueued();
        metrics.record_write_failed();
        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot, EngineMetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_write_success_rate() {
        let snapshot = EngineMetricsSnapshot {
            writes_ok: 90,
            writes_failed: 10,
            ..Default::default()
        };

        assert_eq!(snapshot.write_success_rate(), Some(0.9));
    }

    #[test]
    fn test_snapshot_write_success_rate_empty() {
        let snapshot = EngineMetricsSnapshot::default();
        assert_eq!(snapshot.write_success_rate(), None);
    }

    #[test]
    fn test_snapshot_diff() {
        let prev = EngineMetricsSnapshot {
            records_submitted: 100,
            jobs_enqueued: 80,
            writes_ok: 75,
            ..Default::default()
        };

        let current = EngineMetricsSnapshot {
            records_submitted: 250,
            jobs_enqueued: 200,
            writes_ok: 190,
            queue_depth: 4,
            ..Default::default()
        };

        let diff = current.diff(&prev);
        assert_eq!(diff.records_submitted, 150);
        assert_eq!(diff.jobs_enqueued, 120);
        assert_eq!(diff.writes_ok, 115);
        assert_eq!(diff.queue_depth, 4);
    }

    #[test]
    fn test_snapshot_diff_saturating() {
        let prev = EngineMetricsSnapshot {
            writes_ok: 100,
            ..Default::default()
        };

        let current = EngineMetricsSnapshot {
            writes_ok: 50, // Less than previous (shouldn't happen, but handle gracefully)
            ..Default::default()
        };

        let diff = current.diff(&prev);
        assert_eq!(diff.writes_ok, 0); // Saturating sub prevents underflow
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(EngineMetrics::new());
        let mut handles = vec![];

        // Spawn multiple threads incrementing metrics
        for _ in 0..4 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    m.record_submitted();
                    m.record_enqueued();
                    m.record_dequeued();
                    m.record_write_ok();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_submitted, 4000);
        assert_eq!(snapshot.jobs_enqueued, 4000);
        assert_eq!(snapshot.writes_ok, 4000);
        assert_eq!(snapshot.queue_depth, 0);
    }
}
