use std::fmt::{self, Debug, Formatter};
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};

use super::{EntryId, ResourceInfo};

/// The mutable half of a pooled entry.
///
/// While the entry is idle the resource lives in `resource`. While it is
/// borrowed the resource is held by the lease and `resource` is `None`.
pub(crate) struct Slot<T> {
    pub resource: Option<T>,
    pub info: ResourceInfo,
    pub borrowed: bool,
    pub valid: bool,
}

impl<T> Slot<T> {
    pub fn is_idle(&self) -> bool {
        self.valid && !self.borrowed && self.resource.is_some()
    }

    /// Move an idle resource out to a borrower.
    pub fn claim(&mut self) -> Option<T> {
        if !self.is_idle() {
            return None;
        }
        self.borrowed = true;
        self.info.last_borrowed.replace(Instant::now());
        self.info.borrow_count += 1;
        self.resource.take()
    }

    /// Accept a resource back from its borrower, returning the stamp used
    /// to arm the idle eviction check.
    pub fn park(&mut self, resource: T) -> Instant {
        let now = Instant::now();
        self.borrowed = false;
        self.info.last_returned.replace(now);
        self.resource.replace(resource);
        now
    }

    /// Mark the entry invalid, taking any resource still held in the slot.
    pub fn retire(&mut self) -> Option<T> {
        self.valid = false;
        self.borrowed = false;
        self.resource.take()
    }
}

pub(crate) struct Entry<T> {
    id: EntryId,
    slot: Mutex<Slot<T>>,
}

impl<T> Entry<T> {
    /// A freshly created entry starts out in the hands of the borrower that
    /// requested its creation.
    pub fn borrowed(id: EntryId) -> Self {
        let mut info = ResourceInfo::new(id);
        info.last_borrowed.replace(info.created_at);
        info.borrow_count = 1;
        Self {
            id,
            slot: Mutex::new(Slot {
                resource: None,
                info,
                borrowed: true,
                valid: true,
            }),
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock()
    }

    /// Claim the resource if the entry is still idle and valid.
    pub fn try_claim(&self) -> Option<(T, ResourceInfo)> {
        let mut slot = self.slot.lock();
        slot.claim().map(|res| (res, slot.info))
    }

    /// Retire the entry if it is idle and has not been returned again since
    /// `returned_at`.
    pub fn try_expire(&self, returned_at: Instant) -> Option<(T, ResourceInfo)> {
        let mut slot = self.slot.lock();
        if slot.is_idle() && slot.info.last_returned == Some(returned_at) {
            slot.retire().map(|res| (res, slot.info))
        } else {
            None
        }
    }

    /// Retire the entry if it is idle, regardless of when it was returned.
    pub fn try_retire_idle(&self) -> Option<(T, ResourceInfo)> {
        let mut slot = self.slot.lock();
        if slot.is_idle() {
            slot.retire().map(|res| (res, slot.info))
        } else {
            None
        }
    }
}

impl<T> Debug for Entry<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("borrowed", &slot.borrowed)
            .field("valid", &slot.valid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_and_park() {
        let entry = Entry::<u32>::borrowed(EntryId::next());
        assert!(entry.try_claim().is_none());

        let stamp = entry.lock().park(5);
        let (res, info) = entry.try_claim().unwrap();
        assert_eq!(res, 5);
        assert_eq!(info.borrow_count, 2);
        assert!(entry.try_claim().is_none());

        // a stale expiry stamp is ignored once the entry is borrowed
        assert!(entry.try_expire(stamp).is_none());
    }

    #[test]
    fn expire_requires_matching_stamp() {
        let entry = Entry::<u32>::borrowed(EntryId::next());
        let first = entry.lock().park(1);
        entry.try_claim().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = entry.lock().park(1);
        assert_ne!(first, second);

        assert!(entry.try_expire(first).is_none());
        assert_eq!(entry.try_expire(second).map(|(r, _)| r), Some(1));
        assert!(!entry.lock().valid);
        assert!(entry.try_claim().is_none());
    }
}
