//! Fanlog - Registry
//!
//! The destination table and the ordering primitive that protects it.
//!
//! # Architecture
//!
//! Destinations are described by a [`DestinationSpec`], validated and
//! installed by the [`DestinationRegistry`], and addressed everywhere else
//! by [`DestinationId`]. The dispatch path never holds table references
//! across a write: it snapshots matching entries per log call, then
//! re-resolves each id at delivery time so removal can proceed underneath
//! in-flight work.
//!
//! ```text
//! [DestinationSpec] --register--> [DestinationRegistry]
//!                                        |
//!                    snapshot_matching   |   get(id)
//!                         (per call)     |  (per delivery)
//!                                        v
//!                               [DestinationEntry] -- gate() --> ordered writes
//! ```
//!
//! Every entry owns a [`DeliveryGate`]; tickets issued from it serialize
//! writes to that destination in issue order, and unregistration drains
//! the gate before the entry is released.
//!
//! # Example
//!
//! ```
//! use fanlog_protocol::{Level, Levels};
//! use fanlog_registry::{DestinationRegistry, DestinationSpec};
//!
//! # fn main() -> fanlog_protocol::Result<()> {
//! let registry = DestinationRegistry::new(5);
//! let id = registry.register(DestinationSpec::console_stdout())?;
//!
//! for entry in registry.snapshot_matching(Level::Info) {
//!     assert_eq!(entry.id(), id);
//! }
//!
//! registry.update_levels(id, Levels::at_or_above(Level::Warning))?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Modules
// =============================================================================

/// Destination descriptors - kinds, per-kind defaults, registration specs
pub mod destination;

/// Per-destination delivery turnstile
pub mod gate;

/// Compact destination identifier
pub mod id;

/// The destination table
pub mod registry;

// =============================================================================
// Public re-exports
// =============================================================================

pub use destination::{DeliveryMode, DestinationKind, DestinationSpec};
pub use gate::{DeliveryGate, DeliveryTicket};
pub use id::DestinationId;
pub use registry::{DestinationEntry, DestinationRegistry};

// Tests are registered in their respective modules via #[cfg(test)]
// See: destination.rs, gate.rs, id.rs, registry_test.rs
