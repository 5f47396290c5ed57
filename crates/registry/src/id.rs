//! Destination identifier type
//!
//! `DestinationId` is a lightweight, Copy handle for registered
//! destinations. Snapshots and dispatch jobs carry ids, never references,
//! so registry mutation can proceed while jobs are in flight.

use std::fmt;

/// Destination identifier returned by registration
///
/// A small handle that names a slot in the destination table. Designed to
/// be `Copy` and fit in a register so snapshots stay cheap.
///
/// # Example
///
/// ```
/// use fanlog_registry::DestinationId;
///
/// let id = DestinationId::new(0);
/// let copy = id;  // Copy, not move
/// assert_eq!(id, copy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(u16);

impl DestinationId {
    /// Maximum number of destination slots supported
    pub const MAX: u16 = u16::MAX;

    /// Create an id from a numeric slot index
    ///
    /// Ids are assigned sequentially by the registry; slots freed by
    /// unregistration are reused.
    #[inline]
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get the numeric slot index
    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Get the index as usize (for table indexing)
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dest:{}", self.0)
    }
}

impl From<u16> for DestinationId {
    #[inline]
    fn from(index: u16) -> Self {
        Self::new(index)
    }
}

impl From<DestinationId> for u16 {
    #[inline]
    fn from(id: DestinationId) -> Self {
        id.0
    }
}

impl From<DestinationId> for usize {
    #[inline]
    fn from(id: DestinationId) -> Self {
        id.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id = DestinationId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.as_usize(), 42);
    }

    #[test]
    fn test_equality_and_ordering() {
        assert_eq!(DestinationId::new(5), DestinationId::new(5));
        assert_ne!(DestinationId::new(5), DestinationId::new(10));
        assert!(DestinationId::new(1) < DestinationId::new(2));
    }

    #[test]
    fn test_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(DestinationId::new(1));
        set.insert(DestinationId::new(2));
        set.insert(DestinationId::new(1));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(DestinationId::new(123).to_string(), "dest:123");
    }

    #[test]
    fn test_conversions() {
        let id: DestinationId = 99u16.into();
        assert_eq!(u16::from(id), 99);
        assert_eq!(usize::from(id), 99);
    }

    #[test]
    fn test_size() {
        assert_eq!(std::mem::size_of::<DestinationId>(), 2);
    }

    #[test]
    fn test_const_new() {
        const ID: DestinationId = DestinationId::new(10);
        assert_eq!(ID.index(), 10);
    }
}
