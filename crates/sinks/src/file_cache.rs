//! Bounded cache of open log file handles
//!
//! # Design
//!
//! - One entry per canonical path. A second acquire for the same path
//!   returns the existing entry, which is what keeps the descriptor count
//!   bounded and prevents interleaved writes from duplicate handles.
//! - The cache owns every entry; callers hold [`FileLease`] borrow tokens
//!   that expire when dropped. An entry is evictable only while no lease
//!   is outstanding.
//! - Each entry has its own write lock. The map lock covers only lookup,
//!   insert, and eviction, so writers to different files never contend.
//! - Over capacity, the least-recently-used unleased entry is closed. If
//!   every entry is leased, `acquire` waits for a lease to return and
//!   fails with `ResourceExhausted` at the timeout.
//!
//! Rotation thresholds are supplied per entry at first acquire. When a
//! threshold trips, the current file is archived beside the original path
//! and a fresh file is opened; if archiving fails the write proceeds into
//! the oversized file rather than being dropped.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use fanlog_protocol::{Error, Result};

/// Default roll threshold for cached files (5 MiB)
pub const DEFAULT_ROLL_SIZE: u64 = 5 * 1024 * 1024;

// =============================================================================
// Options
// =============================================================================

/// When a cached file is rolled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Roll before a write would push the file past this many bytes
    pub max_size: Option<u64>,

    /// Roll when the open file is older than this
    pub max_age: Option<Duration>,
}

impl RotationPolicy {
    /// Never roll
    pub const fn none() -> Self {
        Self {
            max_size: None,
            max_age: None,
        }
    }

    /// Whether a write bringing the file to `size_after` bytes at `age`
    /// should roll first
    fn should_roll(&self, written: u64, size_after: u64, age: Duration) -> bool {
        if written == 0 {
            // Never roll an empty file out of the way.
            return false;
        }
        if let Some(max) = self.max_size {
            if size_after > max {
                return true;
            }
        }
        if let Some(max) = self.max_age {
            if age >= max {
                return true;
            }
        }
        false
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: Some(DEFAULT_ROLL_SIZE),
            max_age: None,
        }
    }
}

/// How `acquire` opens a path that is not yet cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Append to the existing file, creating it if missing
    #[default]
    Append,
    /// Truncate any existing file
    Truncate,
}

/// Options applied when `acquire` creates a new entry
///
/// A second acquire for an already-cached path returns the existing entry;
/// the options of the first acquire stay in effect for the entry's lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOptions {
    /// Open mode for a new entry
    pub mode: OpenMode,

    /// Roll thresholds for the entry
    pub rotation: RotationPolicy,

    /// Write a session header line on open and after each roll
    pub header: bool,
}

impl FileOptions {
    /// Append mode with default rotation and a session header
    pub fn appending() -> Self {
        Self {
            mode: OpenMode::Append,
            rotation: RotationPolicy::default(),
            header: true,
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

/// Mutable half of a cache entry, guarded by the entry lock
struct EntryState {
    /// Open handle; `None` after a failed reopen until the next write retries
    file: Option<File>,
    /// Current size of the open file in bytes
    size: u64,
    /// When the current file was opened, for age-based rolling
    opened: Instant,
    /// Writes completed on this entry
    writes: u64,
    /// Writes failed on this entry
    errors: u64,
}

/// One cached open file, keyed by canonical path
pub struct FileEntry {
    /// Canonical path, the cache key
    path: PathBuf,
    /// Original path text for diagnostics
    display: String,
    /// Options fixed at first acquire
    options: FileOptions,
    /// Write lock; serializes writes and rolls on this entry only
    state: Mutex<EntryState>,
    /// Outstanding leases; the entry is evictable only at zero
    borrowers: AtomicU32,
    /// Last write or acquire, as epoch milliseconds, for LRU and idle eviction
    last_used_ms: AtomicU64,
}

impl FileEntry {
    fn open(path: PathBuf, display: String, options: FileOptions) -> Result<Self> {
        let file = open_at(&path, options.mode).map_err(|e| Error::io(display.clone(), e))?;

        let entry = Self {
            path,
            display,
            options,
            state: Mutex::new(EntryState {
                file: Some(file),
                size: 0,
                opened: Instant::now(),
                writes: 0,
                errors: 0,
            }),
            borrowers: AtomicU32::new(0),
            last_used_ms: AtomicU64::new(now_ms()),
        };

        {
            let mut state = entry.state.lock();
            if let Some(file) = state.file.as_ref() {
                state.size = file.metadata().map(|m| m.len()).unwrap_or(0);
            }
            if entry.options.header {
                let header = format!("----- session begin @ {} -----\n", header_stamp());
                entry.append_raw(&mut state, header.as_bytes());
            }
        }

        Ok(entry)
    }

    /// Write the text under the entry lock, rolling first if a threshold
    /// would be crossed
    fn write(&self, text: &str, metrics: &CacheMetrics) -> Result<()> {
        let bytes = text.as_bytes();
        let mut state = self.state.lock();

        if state.file.is_none() {
            // A previous roll lost the handle; try again before writing.
            match open_at(&self.path, OpenMode::Append) {
                Ok(file) => {
                    state.size = file.metadata().map(|m| m.len()).unwrap_or(0);
                    state.file = Some(file);
                    state.opened = Instant::now();
                }
                Err(e) => {
                    state.errors += 1;
                    metrics.record_write_error();
                    return Err(Error::io(self.display.clone(), e));
                }
            }
        }

        let size_after = state.size.saturating_add(bytes.len() as u64);
        if self
            .options
            .rotation
            .should_roll(state.size, size_after, state.opened.elapsed())
        {
            self.roll(&mut state, metrics);
        }

        let result = match state.file.as_mut() {
            Some(file) => file.write_all(bytes),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "log file is not open",
            )),
        };

        match result {
            Ok(()) => {
                state.size = state.size.saturating_add(bytes.len() as u64);
                state.writes += 1;
                self.touch();
                metrics.record_write();
                Ok(())
            }
            Err(e) => {
                state.errors += 1;
                metrics.record_write_error();
                Err(Error::io(self.display.clone(), e))
            }
        }
    }

    /// Archive the current file and reopen a fresh one at the same path
    ///
    /// A failed rename is reported and the entry keeps writing in place;
    /// an oversized file is always preferred over dropped records.
    fn roll(&self, state: &mut EntryState, metrics: &CacheMetrics) {
        let archive = rolled_path(&self.path);

        // Close before renaming; some platforms refuse to rename open files.
        state.file = None;

        let archived = match std::fs::rename(&self.path, &archive) {
            Ok(()) => {
                metrics.record_roll();
                debug!(
                    path = %self.display,
                    archive = %archive.display(),
                    "rolled log file"
                );
                true
            }
            Err(e) => {
                metrics.record_roll_failure();
                warn!(
                    path = %self.display,
                    error = %e,
                    "roll rename failed, continuing in place"
                );
                false
            }
        };

        match open_at(&self.path, OpenMode::Append) {
            Ok(file) => {
                state.size = file.metadata().map(|m| m.len()).unwrap_or(0);
                state.file = Some(file);
                state.opened = Instant::now();
                if self.options.header && archived {
                    let name = archive
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| archive.display().to_string());
                    let header = format!(
                        "----- rolled @ {}, archived as {} -----\n",
                        header_stamp(),
                        name
                    );
                    self.append_raw(state, header.as_bytes());
                }
            }
            Err(e) => {
                // Leave the handle empty; the next write retries the open.
                warn!(path = %self.display, error = %e, "reopen after roll failed");
            }
        }
    }

    /// Best-effort write that bypasses rotation, used for header lines
    fn append_raw(&self, state: &mut EntryState, bytes: &[u8]) {
        if let Some(file) = state.file.as_mut() {
            match file.write_all(bytes) {
                Ok(()) => state.size = state.size.saturating_add(bytes.len() as u64),
                Err(e) => warn!(path = %self.display, error = %e, "header write failed"),
            }
        }
    }

    #[inline]
    fn touch(&self) {
        self.last_used_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Canonical path of this entry
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes completed on this entry
    pub fn write_count(&self) -> u64 {
        self.state.lock().writes
    }

    /// Writes failed on this entry
    pub fn error_count(&self) -> u64 {
        self.state.lock().errors
    }
}

// =============================================================================
// Lease
// =============================================================================

/// Borrow token for a cached file, valid for the holder's write calls
///
/// The cache cannot evict an entry while a lease for it is alive, and a
/// lease cannot outlive the data it borrows: dropping it is the release,
/// so an unpaired release or a double close is unrepresentable.
pub struct FileLease {
    entry: Arc<FileEntry>,
    shared: Arc<CacheShared>,
}

impl FileLease {
    /// Write one formatted chunk to the leased file
    pub fn write(&self, text: &str) -> Result<()> {
        self.entry.write(text, &self.shared.metrics)
    }

    /// Canonical path of the leased file
    pub fn path(&self) -> &Path {
        self.entry.path()
    }
}

impl Drop for FileLease {
    fn drop(&mut self) {
        // Decrement under the map lock so a waiting acquire cannot miss
        // the wakeup between its evictability check and its sleep.
        let guard = self.shared.map.lock();
        self.entry.borrowers.fetch_sub(1, Ordering::Relaxed);
        drop(guard);
        self.shared.lease_returned.notify_all();
    }
}

impl std::fmt::Debug for FileLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLease")
            .field("path", &self.entry.path())
            .finish()
    }
}

// =============================================================================
// Cache
// =============================================================================

struct CacheShared {
    map: Mutex<HashMap<PathBuf, Arc<FileEntry>>>,
    lease_returned: Condvar,
    metrics: CacheMetrics,
}

/// Bounded, path-keyed cache of open log files
pub struct FileCache {
    shared: Arc<CacheShared>,
    capacity: usize,
    acquire_timeout: Duration,
}

impl FileCache {
    /// Create a cache holding at most `capacity` open handles
    pub fn new(capacity: usize, acquire_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                map: Mutex::new(HashMap::new()),
                lease_returned: Condvar::new(),
                metrics: CacheMetrics::new(),
            }),
            capacity: capacity.max(1),
            acquire_timeout,
        }
    }

    /// Borrow the open file for `path`, opening it if necessary
    ///
    /// Blocks up to the configured acquire timeout when the cache is at
    /// capacity with every entry leased, then fails with
    /// `ResourceExhausted`. Open failures surface as `Io` and leave other
    /// entries untouched.
    pub fn acquire(&self, path: &Path, options: FileOptions) -> Result<FileLease> {
        let key = canonical_key(path)?;
        let deadline = Instant::now() + self.acquire_timeout;

        let mut map = self.shared.map.lock();
        loop {
            if let Some(entry) = map.get(&key) {
                entry.borrowers.fetch_add(1, Ordering::Relaxed);
                entry.touch();
                self.shared.metrics.record_hit();
                return Ok(FileLease {
                    entry: Arc::clone(entry),
                    shared: Arc::clone(&self.shared),
                });
            }

            if map.len() < self.capacity {
                break;
            }

            if let Some(victim) = lru_unleased(&map) {
                map.remove(&victim);
                self.shared.metrics.record_evicted_lru();
                debug!(path = %victim.display(), "evicted least-recently-used entry");
                continue;
            }

            // Every entry is leased; wait for one to come back.
            if self
                .shared
                .lease_returned
                .wait_until(&mut map, deadline)
                .timed_out()
            {
                return Err(Error::exhausted("file cache", self.acquire_timeout));
            }
        }

        // Open while holding the map lock: a racing acquire for the same
        // path must find this entry instead of opening a second handle.
        let entry = Arc::new(FileEntry::open(
            key.clone(),
            path.display().to_string(),
            options,
        )?);
        entry.borrowers.store(1, Ordering::Relaxed);
        self.shared.metrics.record_open();
        map.insert(key, Arc::clone(&entry));

        Ok(FileLease {
            entry,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Close entries with no lease that have been idle longer than `max_age`
    ///
    /// Runs on the worker pool's housekeeping tick so producers never pay
    /// eviction cost.
    pub fn evict_idle(&self, max_age: Duration) -> usize {
        let cutoff = now_ms().saturating_sub(max_age.as_millis() as u64);
        let mut map = self.shared.map.lock();
        let before = map.len();
        map.retain(|_, entry| {
            entry.borrowers.load(Ordering::Relaxed) > 0
                || entry.last_used_ms.load(Ordering::Relaxed) >= cutoff
        });
        let evicted = before - map.len();
        if evicted > 0 {
            self.shared.metrics.record_evicted_idle(evicted as u64);
            debug!(evicted, "closed idle log files");
            self.shared.lease_returned.notify_all();
        }
        evicted
    }

    /// Drop the entry for `path` if present
    ///
    /// Called when a file destination is unregistered, after its in-flight
    /// jobs have drained. An outstanding lease keeps the underlying file
    /// alive until it is dropped; the cache just stops tracking it.
    pub fn remove(&self, path: &Path) -> bool {
        let Ok(key) = canonical_key(path) else {
            return false;
        };
        let removed = self.shared.map.lock().remove(&key).is_some();
        if removed {
            self.shared.lease_returned.notify_all();
        }
        removed
    }

    /// Close every entry
    pub fn close_all(&self) {
        self.shared.map.lock().clear();
        self.shared.lease_returned.notify_all();
    }

    /// Number of cached open files
    pub fn len(&self) -> usize {
        self.shared.map.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time counters
    pub fn metrics(&self) -> CacheMetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl std::fmt::Debug for FileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

/// Least-recently-used entry with no outstanding lease, if any
fn lru_unleased(map: &HashMap<PathBuf, Arc<FileEntry>>) -> Option<PathBuf> {
    map.iter()
        .filter(|(_, entry)| entry.borrowers.load(Ordering::Relaxed) == 0)
        .min_by_key(|(_, entry)| entry.last_used_ms.load(Ordering::Relaxed))
        .map(|(path, _)| path.clone())
}

// =============================================================================
// Metrics
// =============================================================================

/// Counters for cache activity
#[derive(Debug, Default)]
pub struct CacheMetrics {
    opens: AtomicU64,
    hits: AtomicU64,
    evicted_lru: AtomicU64,
    evicted_idle: AtomicU64,
    rolls: AtomicU64,
    roll_failures: AtomicU64,
    writes: AtomicU64,
    write_errors: AtomicU64,
}

impl CacheMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            opens: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            evicted_lru: AtomicU64::new(0),
            evicted_idle: AtomicU64::new(0),
            rolls: AtomicU64::new(0),
            roll_failures: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_open(&self) {
        self.opens.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_evicted_lru(&self) {
        self.evicted_lru.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_evicted_idle(&self, count: u64) {
        self.evicted_idle.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    fn record_roll(&self) {
        self.rolls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_roll_failure(&self) {
        self.roll_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            opens: self.opens.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            evicted_lru: self.evicted_lru.load(Ordering::Relaxed),
            evicted_idle: self.evicted_idle.load(Ordering::Relaxed),
            rolls: self.rolls.load(Ordering::Relaxed),
            roll_failures: self.roll_failures.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CacheMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    /// Files opened (cache misses)
    pub opens: u64,
    /// Acquires satisfied by an existing entry
    pub hits: u64,
    /// Entries closed to make room
    pub evicted_lru: u64,
    /// Entries closed by the idle sweep
    pub evicted_idle: u64,
    /// Successful file rolls
    pub rolls: u64,
    /// Rolls whose archive rename failed
    pub roll_failures: u64,
    /// Writes completed
    pub writes: u64,
    /// Writes failed
    pub write_errors: u64,
}

// =============================================================================
// Helpers
// =============================================================================

/// Stable cache key for a path whose file may not exist yet
fn canonical_key(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return Ok(canonical);
    }

    let file_name = path.file_name().ok_or_else(|| {
        Error::invalid_config("file path", format!("{} has no file name", path.display()))
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let parent = std::fs::canonicalize(parent)
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    Ok(parent.join(file_name))
}

fn open_at(path: &Path, mode: OpenMode) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        OpenMode::Append => options.append(true),
        OpenMode::Truncate => options.write(true).truncate(true),
    };
    options.open(path)
}

/// Archive name for a rolled file: `app.log` becomes `app-20260105-073459161.log`
fn rolled_path(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S%3f");
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("log");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}-{stamp}.{ext}"),
        None => format!("{stem}-{stamp}"),
    };
    path.with_file_name(name)
}

fn header_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "file_cache_test.rs"]
mod file_cache_test;
