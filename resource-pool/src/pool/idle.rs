use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use concurrent_queue::ConcurrentQueue;
use event_listener::{Event, EventListener};

use crate::resource::{Entry, ResourceInfo};

pub(crate) type Claimed<T> = (Arc<Entry<T>>, T, ResourceInfo);

/// FIFO set of resources available for borrowing.
///
/// Entries retired while queued (by the evictor or a drain) are not removed
/// from the queue; they are skipped when popped. `count` only tracks entries
/// which are actually idle.
pub(crate) struct IdleSet<T> {
    available: Event,
    count: AtomicUsize,
    queue: ConcurrentQueue<Arc<Entry<T>>>,
}

impl<T> IdleSet<T> {
    pub fn new() -> Self {
        Self {
            available: Event::new(),
            count: AtomicUsize::new(0),
            queue: ConcurrentQueue::unbounded(),
        }
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Add a parked entry at the tail and wake one waiting borrower.
    pub fn push(&self, entry: Arc<Entry<T>>) {
        self.count.fetch_add(1, Ordering::AcqRel);
        // The queue is never closed or full, so this should not fail.
        if self.queue.push(entry).is_err() {
            self.count.fetch_sub(1, Ordering::AcqRel);
        }
        self.available.notify_additional(1);
    }

    /// Pop entries from the head until one can be claimed.
    pub fn try_claim(&self) -> Option<Claimed<T>> {
        while let Ok(entry) = self.queue.pop() {
            if let Some((res, info)) = entry.try_claim() {
                self.count.fetch_sub(1, Ordering::AcqRel);
                return Some((entry, res, info));
            } else {
                // Drop the entry - it was retired while queued.
            }
        }
        None
    }

    /// Retire a queued entry if it has sat idle since `returned_at`.
    pub fn expire(&self, entry: &Entry<T>, returned_at: Instant) -> Option<(T, ResourceInfo)> {
        let expired = entry.try_expire(returned_at);
        if expired.is_some() {
            self.count.fetch_sub(1, Ordering::AcqRel);
        }
        expired
    }

    /// Retire every queued entry, returning the resources to dispose of.
    pub fn drain(&self) -> Vec<Claimed<T>> {
        let mut drained = Vec::new();
        while let Ok(entry) = self.queue.pop() {
            if let Some((res, info)) = entry.try_retire_idle() {
                self.count.fetch_sub(1, Ordering::AcqRel);
                drained.push((entry, res, info));
            }
        }
        drained
    }

    /// Register interest in the next push. Listen before checking the queue
    /// so that a push in between is not missed.
    pub fn listen(&self) -> EventListener {
        self.available.listen()
    }

    /// Wake one waiting borrower without adding an entry, so it can retry
    /// creation once capacity frees up.
    pub fn notify_one(&self) {
        self.available.notify_additional(1);
    }

    /// Wake every waiting borrower.
    pub fn notify_all(&self) {
        self.available.notify(usize::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::EntryId;

    fn parked(value: u32) -> (Arc<Entry<u32>>, Instant) {
        let entry = Arc::new(Entry::borrowed(EntryId::next()));
        let stamp = entry.lock().park(value);
        (entry, stamp)
    }

    #[test]
    fn fifo_order() {
        let idle = IdleSet::new();
        idle.push(parked(1).0);
        idle.push(parked(2).0);
        assert_eq!(idle.len(), 2);
        assert_eq!(idle.try_claim().map(|(_, r, _)| r), Some(1));
        assert_eq!(idle.try_claim().map(|(_, r, _)| r), Some(2));
        assert!(idle.try_claim().is_none());
        assert_eq!(idle.len(), 0);
    }

    #[test]
    fn expired_entries_are_skipped() {
        let idle = IdleSet::new();
        let (first, stamp) = parked(1);
        idle.push(first.clone());
        idle.push(parked(2).0);
        assert_eq!(idle.expire(&first, stamp).map(|(r, _)| r), Some(1));
        assert_eq!(idle.len(), 1);
        assert_eq!(idle.try_claim().map(|(_, r, _)| r), Some(2));
    }

    #[test]
    fn drain_retires_all() {
        let idle = IdleSet::new();
        idle.push(parked(1).0);
        idle.push(parked(2).0);
        let drained = idle.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained.iter().all(|(entry, _, _)| !entry.lock().valid));
        assert_eq!(idle.len(), 0);
    }
}
