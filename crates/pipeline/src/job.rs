//! Dispatch jobs
//!
//! A job is one record bound to the queued destinations that matched it
//! at log time. Targets carry the destination id, not an entry reference,
//! so the table can shrink while jobs are in flight; each target also
//! carries its gate ticket, which fixes the record's write position at
//! every destination the moment the job is accepted.

use fanlog_protocol::LogRecord;
use fanlog_registry::{DeliveryTicket, DestinationId};

/// One destination a job must reach
pub struct DispatchTarget {
    /// Which destination to write to, re-resolved at delivery time
    pub id: DestinationId,
    /// The record's reserved write position at that destination
    pub ticket: DeliveryTicket,
}

/// One record plus everywhere it still has to go
///
/// Dropping a job finishes its tickets, so an evicted or abandoned job
/// never blocks later writers.
pub struct DispatchJob {
    pub record: LogRecord,
    pub targets: Vec<DispatchTarget>,
}

impl std::fmt::Debug for DispatchJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchJob")
            .field("level", &self.record.level())
            .field("targets", &self.targets.len())
            .finish()
    }
}
