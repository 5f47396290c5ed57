//! Per-destination delivery turnstile
//!
//! Every destination owns a [`DeliveryGate`]: a pair of counters behind a
//! mutex/condvar. A [`DeliveryTicket`] is taken for each pending delivery
//! to that destination, and a writer waits its turn before touching the
//! sink, which gives two guarantees from one mechanism:
//!
//! - writes to a destination happen in ticket order, even when several
//!   workers hold jobs targeting it at once;
//! - `drain` can wait for the in-flight count to reach zero, which is what
//!   unregistration needs before tearing a destination down.
//!
//! # Ordering discipline
//!
//! Queued jobs take all their tickets atomically under the dispatch
//! queue's lock, so any two jobs order the same way at every destination
//! they share. The direct path takes one ticket at a time and completes
//! it before taking the next. Both rules together make `await_turn` free
//! of deadlock: a waiter is only ever behind tickets whose holders are
//! actively delivering or queued ahead of it, never behind a ticket
//! enqueued after its own.
//!
//! A ticket completes exactly once: explicitly after a write, or on drop
//! for deliveries that were skipped or evicted. Completions can arrive
//! out of order (an evicted job finishes its tickets while earlier writes
//! are still running), so the gate admits a writer only once the
//! contiguous run of finished tickets covers every position before its
//! own. A later ticket finishing early never releases an earlier waiter.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use fanlog_protocol::{Error, Result};

struct GateState {
    /// Tickets handed out
    issued: u64,
    /// First position not yet finished; everything below is complete
    head: u64,
    /// Positions finished ahead of `head`
    finished_ahead: BTreeSet<u64>,
}

/// Delivery turnstile owned by one destination
pub struct DeliveryGate {
    state: Mutex<GateState>,
    advanced: Condvar,
}

impl DeliveryGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                issued: 0,
                head: 0,
                finished_ahead: BTreeSet::new(),
            }),
            advanced: Condvar::new(),
        }
    }

    /// Take the next ticket
    ///
    /// Callers on the queued path must hold the dispatch queue lock while
    /// taking a job's tickets (see the ordering discipline above).
    pub fn issue(self: &Arc<Self>) -> DeliveryTicket {
        let mut state = self.state.lock();
        let seq = state.issued;
        state.issued += 1;
        DeliveryTicket {
            gate: Arc::clone(self),
            seq,
            done: false,
        }
    }

    /// Tickets taken but not yet finished
    pub fn in_flight(&self) -> u64 {
        let state = self.state.lock();
        state.issued - state.head - state.finished_ahead.len() as u64
    }

    /// Wait until every outstanding ticket has finished
    ///
    /// Fails with `Timeout` if the in-flight count does not reach zero
    /// within the bound.
    pub fn drain(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.head < state.issued {
            if self.advanced.wait_until(&mut state, deadline).timed_out() {
                return Err(Error::timeout("destination drain", timeout));
            }
        }
        Ok(())
    }

    fn advance(&self, seq: u64) {
        let mut state = self.state.lock();
        if seq == state.head {
            state.head += 1;
            // Sweep positions that finished while waiting on this one.
            let st = &mut *state;
            while st.finished_ahead.remove(&st.head) {
                st.head += 1;
            }
        } else {
            debug_assert!(seq > state.head);
            state.finished_ahead.insert(seq);
        }
        drop(state);
        self.advanced.notify_all();
    }
}

impl Default for DeliveryGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeliveryGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DeliveryGate")
            .field("issued", &state.issued)
            .field("head", &state.head)
            .field("finished_ahead", &state.finished_ahead.len())
            .finish()
    }
}

/// One pending delivery to a destination
///
/// Completes exactly once; dropping an unfinished ticket counts as
/// completion so evicted and skipped deliveries never stall the gate.
pub struct DeliveryTicket {
    gate: Arc<DeliveryGate>,
    seq: u64,
    done: bool,
}

impl DeliveryTicket {
    /// Position of this ticket in the destination's delivery order
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Block until every earlier ticket has finished
    ///
    /// Call before writing; skip it when the delivery is being skipped, so
    /// a dead destination never delays the rest of the job.
    pub fn await_turn(&self) {
        let mut state = self.gate.state.lock();
        while state.head < self.seq {
            self.gate.advanced.wait(&mut state);
        }
    }

    /// Finish the ticket after a write
    pub fn complete(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.gate.advance(self.seq);
        }
    }
}

impl Drop for DeliveryTicket {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for DeliveryTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryTicket")
            .field("seq", &self.seq)
            .field("done", &self.done)
            .finish()
    }
}
