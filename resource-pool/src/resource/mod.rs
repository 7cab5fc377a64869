use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

mod entry;
pub(crate) use entry::Entry;

mod lease;
pub use lease::Lease;

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// The identity of a pooled resource instance.
///
/// Identifiers are allocated from a process-wide counter and are never
/// reused, so an `EntryId` names a single resource for its entire lifetime
/// and is unique across pools.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle metadata tracked alongside each pooled resource.
#[derive(Copy, Clone, Debug)]
pub struct ResourceInfo {
    pub id: EntryId,
    pub created_at: Instant,
    pub borrow_count: usize,
    pub last_borrowed: Option<Instant>,
    pub last_returned: Option<Instant>,
}

impl ResourceInfo {
    pub(crate) fn new(id: EntryId) -> Self {
        Self {
            id,
            created_at: Instant::now(),
            borrow_count: 0,
            last_borrowed: None,
            last_returned: None,
        }
    }

    /// The time since the resource was last returned, if it has been
    /// returned at least once.
    pub fn idle_for(&self) -> Option<std::time::Duration> {
        self.last_returned.map(|at| at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_ids_are_unique() {
        let a = EntryId::next();
        let b = EntryId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
