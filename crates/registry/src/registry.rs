//! Destination table
//!
//! The registry is the single source of truth for active destinations.
//! Slots are indexed by [`DestinationId`] for O(1) lookup; freed slots are
//! reused. Mutation takes the write lock; the dispatch path only ever
//! takes the read lock, once per log call for the snapshot and once per
//! delivery to re-resolve the id.
//!
//! Jobs carry ids and gate tickets, never entry references, so an entry
//! removed mid-flight is simply not found at delivery time and the
//! delivery is skipped. Unregistration drains the entry's gate before the
//! slot is freed, which is what makes teardown safe.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, warn};

use fanlog_protocol::{Error, Level, Levels, OutputFlags, Result};

use crate::destination::{DeliveryMode, DestinationKind, DestinationSpec};
use crate::gate::DeliveryGate;
use crate::id::DestinationId;

// =============================================================================
// Entry
// =============================================================================

/// One registered destination
///
/// Shared between the registry slot, snapshots, and in-flight deliveries.
/// The level filter and health state are atomics so the hot path never
/// takes the table lock to read them.
pub struct DestinationEntry {
    id: DestinationId,
    name: String,
    kind: DestinationKind,
    flags: OutputFlags,
    delivery: DeliveryMode,
    /// Level filter as `Levels` bits; `update_levels` stores, snapshots load
    levels: AtomicU8,
    gate: Arc<DeliveryGate>,
    /// Set while an unregister is draining this entry
    retiring: AtomicBool,
    /// Consecutive write failures; reset by any success
    consecutive_failures: AtomicU32,
    quarantined: AtomicBool,
}

impl DestinationEntry {
    fn new(id: DestinationId, spec: DestinationSpec) -> Self {
        let levels = spec.effective_levels();
        let flags = spec.effective_flags();
        let delivery = spec.effective_delivery();
        let mut kind = spec.kind;
        // The cache reads the header switch from the open options, not
        // the entry flags.
        if let DestinationKind::File { options, .. } = &mut kind {
            if flags.contains(OutputFlags::NO_HEADER) {
                options.header = false;
            }
        }
        Self {
            id,
            name: spec.name,
            kind,
            flags,
            delivery,
            levels: AtomicU8::new(levels.bits()),
            gate: Arc::new(DeliveryGate::new()),
            retiring: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            quarantined: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> DestinationId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &DestinationKind {
        &self.kind
    }

    #[inline]
    pub fn flags(&self) -> OutputFlags {
        self.flags
    }

    #[inline]
    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    #[inline]
    pub fn levels(&self) -> Levels {
        Levels::from_bits_truncate(self.levels.load(Ordering::Relaxed))
    }

    /// The entry's delivery turnstile
    #[inline]
    pub fn gate(&self) -> &Arc<DeliveryGate> {
        &self.gate
    }

    #[inline]
    pub fn is_quarantined(&self) -> bool {
        self.quarantined.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_retiring(&self) -> bool {
        self.retiring.load(Ordering::Relaxed)
    }

    /// Consecutive write failures so far
    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Whether this entry should receive records at `level` right now
    fn accepts(&self, level: Level) -> bool {
        !self.is_retiring() && !self.is_quarantined() && self.levels().allows(level)
    }

    fn record_failure(&self, threshold: u32) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= threshold {
            !self.quarantined.swap(true, Ordering::Relaxed)
        } else {
            false
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for DestinationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .field("levels", &self.levels())
            .field("delivery", &self.delivery)
            .field("quarantined", &self.is_quarantined())
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Table of active destinations
///
/// Read-mostly: many concurrent snapshotters, rare mutators.
pub struct DestinationRegistry {
    slots: RwLock<Vec<Option<Arc<DestinationEntry>>>>,
    quarantine_threshold: u32,
}

impl DestinationRegistry {
    /// Create an empty registry
    ///
    /// `quarantine_threshold` is the number of consecutive write failures
    /// after which a destination stops receiving dispatch attempts.
    pub fn new(quarantine_threshold: u32) -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            quarantine_threshold: quarantine_threshold.max(1),
        }
    }

    /// Register a destination, returning its stable handle
    ///
    /// Validation is all-or-nothing: a rejected spec mutates nothing.
    /// Fails with `InvalidConfig` on an empty level filter, a second
    /// console destination for the same stream, or an unwritable file
    /// path (probed once, here).
    pub fn register(&self, spec: DestinationSpec) -> Result<DestinationId> {
        if spec.effective_levels().is_empty() {
            return Err(Error::invalid_config(
                "destination",
                format!("{:?} has an empty level filter", spec.name),
            ));
        }

        // Probe outside the table lock; opening a file under it would
        // stall every concurrent log call.
        if let DestinationKind::File { path, .. } = &spec.kind {
            let probe = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path);
            if let Err(e) = probe {
                return Err(Error::invalid_config(
                    "file destination",
                    format!("{} is not writable: {e}", path.display()),
                ));
            }
        }

        let mut slots = self.slots.write();

        // Uniqueness is checked under the write lock so two racing
        // registrations cannot both pass.
        match spec.kind {
            DestinationKind::ConsoleStdout => {
                if slots.iter().flatten().any(|e| {
                    matches!(e.kind, DestinationKind::ConsoleStdout)
                }) {
                    return Err(Error::invalid_config(
                        "destination",
                        "a console-stdout destination is already registered",
                    ));
                }
            }
            DestinationKind::ConsoleStderr => {
                if slots.iter().flatten().any(|e| {
                    matches!(e.kind, DestinationKind::ConsoleStderr)
                }) {
                    return Err(Error::invalid_config(
                        "destination",
                        "a console-stderr destination is already registered",
                    ));
                }
            }
            _ => {}
        }

        let index = match slots.iter().position(|slot| slot.is_none()) {
            Some(index) => index,
            None => {
                if slots.len() > DestinationId::MAX as usize {
                    return Err(Error::invalid_config(
                        "destination",
                        "destination table is full",
                    ));
                }
                slots.push(None);
                slots.len() - 1
            }
        };

        let id = DestinationId::new(index as u16);
        let entry = Arc::new(DestinationEntry::new(id, spec));
        debug!(
            id = %id,
            destination = %entry.name,
            kind = entry.kind.label(),
            levels = ?entry.levels(),
            delivery = %entry.delivery,
            "registered destination"
        );
        slots[index] = Some(entry);

        Ok(id)
    }

    /// Remove a destination after its in-flight deliveries finish
    ///
    /// Blocks up to `drain_timeout` for the entry's gate to empty. On
    /// timeout the entry is left registered and active, and the call
    /// fails with `Timeout`; the caller may retry. On success the removed
    /// entry is returned so the caller can release kind-specific
    /// resources (cached file handle, plugin teardown).
    pub fn unregister(
        &self,
        id: DestinationId,
        drain_timeout: Duration,
    ) -> Result<Arc<DestinationEntry>> {
        let entry = {
            let slots = self.slots.read();
            let entry = slots
                .get(id.as_usize())
                .and_then(|slot| slot.as_ref())
                .ok_or_else(|| {
                    Error::invalid_state(format!("no destination registered at {id}"))
                })?;
            Arc::clone(entry)
        };

        if entry.retiring.swap(true, Ordering::SeqCst) {
            return Err(Error::invalid_state(format!(
                "{id} is already being removed"
            )));
        }

        // New snapshots now exclude the entry; wait for deliveries already
        // holding tickets. The table lock stays free so workers can keep
        // resolving and completing.
        if let Err(e) = entry.gate.drain(drain_timeout) {
            // Leave the destination exactly as it was.
            entry.retiring.store(false, Ordering::SeqCst);
            warn!(
                id = %id,
                destination = %entry.name,
                in_flight = entry.gate.in_flight(),
                "unregister drain timed out, destination stays active"
            );
            return Err(e);
        }

        let mut slots = self.slots.write();
        if let Some(slot) = slots.get_mut(id.as_usize()) {
            slot.take();
        }
        debug!(id = %id, destination = %entry.name, "unregistered destination");

        Ok(entry)
    }

    /// Replace a destination's level filter
    pub fn update_levels(&self, id: DestinationId, levels: Levels) -> Result<()> {
        if levels.is_empty() {
            return Err(Error::invalid_config(
                "destination",
                "level filter must enable at least one level",
            ));
        }
        let slots = self.slots.read();
        let entry = slots
            .get(id.as_usize())
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| Error::invalid_state(format!("no destination registered at {id}")))?;
        entry.levels.store(levels.bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Point-in-time copy of the destinations accepting `level`
    ///
    /// Called once per log call. Retiring and quarantined entries are
    /// excluded; registry mutation after the call never changes the
    /// returned set.
    pub fn snapshot_matching(&self, level: Level) -> Vec<Arc<DestinationEntry>> {
        let slots = self.slots.read();
        slots
            .iter()
            .flatten()
            .filter(|entry| entry.accepts(level))
            .map(Arc::clone)
            .collect()
    }

    /// Look up a live entry by id
    ///
    /// Used by the delivery path to re-resolve a job's target; returns
    /// `None` once the destination is removed or retiring.
    pub fn get(&self, id: DestinationId) -> Option<Arc<DestinationEntry>> {
        let slots = self.slots.read();
        slots
            .get(id.as_usize())
            .and_then(|slot| slot.as_ref())
            .filter(|entry| !entry.is_retiring())
            .map(Arc::clone)
    }

    /// Record a failed write, quarantining at the configured threshold
    pub fn note_failure(&self, entry: &DestinationEntry) {
        if entry.record_failure(self.quarantine_threshold) {
            warn!(
                id = %entry.id,
                destination = %entry.name,
                failures = self.quarantine_threshold,
                "destination quarantined after consecutive write failures"
            );
        }
    }

    /// Record a successful write, resetting the failure streak
    pub fn note_success(&self, entry: &DestinationEntry) {
        entry.record_success();
    }

    /// Number of registered destinations
    pub fn len(&self) -> usize {
        self.slots.read().iter().flatten().count()
    }

    /// Whether no destination is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries currently quarantined
    pub fn quarantined_count(&self) -> usize {
        self.slots
            .read()
            .iter()
            .flatten()
            .filter(|entry| entry.is_quarantined())
            .count()
    }

    /// Remove every destination without draining
    ///
    /// Shutdown-only: the caller must have stopped the workers first, so
    /// no gate can still be waited on. Entries are marked retiring so a
    /// racing direct delivery skips them instead of writing to a
    /// destination whose resources are being released.
    pub fn clear(&self) -> Vec<Arc<DestinationEntry>> {
        let mut slots = self.slots.write();
        let entries: Vec<_> = slots.drain(..).flatten().collect();
        for entry in &entries {
            entry.retiring.store(true, Ordering::SeqCst);
        }
        entries
    }
}

impl std::fmt::Debug for DestinationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationRegistry")
            .field("len", &self.len())
            .field("quarantine_threshold", &self.quarantine_threshold)
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
