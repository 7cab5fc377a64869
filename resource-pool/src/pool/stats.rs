use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters describing the activity of a pool.
///
/// These are for reporting only. The pool's own decisions are made from
/// its tracked size and entry state, never from these values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Live tracked resources, borrowed and idle.
    pub size: usize,
    /// Resources currently idle.
    pub idle: usize,
    /// Resources successfully created.
    pub created: u64,
    /// Resources handed to the manager for teardown.
    pub invalidated: u64,
    /// Successful borrows.
    pub borrowed: u64,
    /// Accepted returns, including those which led to invalidation.
    pub returned: u64,
    /// Failed creation attempts, including ones later retried.
    pub create_failures: u64,
    /// The most recent successful borrow or return.
    pub last_access: Option<Instant>,
}

#[derive(Debug)]
pub(crate) struct PoolStats {
    epoch: Instant,
    created: AtomicU64,
    invalidated: AtomicU64,
    borrowed: AtomicU64,
    returned: AtomicU64,
    create_failures: AtomicU64,
    // nanoseconds since `epoch`, offset by one so that zero means never
    last_access: AtomicU64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            created: AtomicU64::new(0),
            invalidated: AtomicU64::new(0),
            borrowed: AtomicU64::new(0),
            returned: AtomicU64::new(0),
            create_failures: AtomicU64::new(0),
            last_access: AtomicU64::new(0),
        }
    }

    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_create_failure(&self) {
        self.create_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidated(&self) {
        self.invalidated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_borrowed(&self) {
        self.borrowed.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_returned(&self) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    fn touch(&self) {
        let nanos = self.epoch.elapsed().as_nanos() as u64;
        self.last_access.fetch_max(nanos + 1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, size: usize, idle: usize) -> PoolStatsSnapshot {
        let last_access = match self.last_access.load(Ordering::Relaxed) {
            0 => None,
            n => Some(self.epoch + Duration::from_nanos(n - 1)),
        };
        PoolStatsSnapshot {
            size,
            idle,
            created: self.created.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            borrowed: self.borrowed.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            create_failures: self.create_failures.load(Ordering::Relaxed),
            last_access,
        }
    }
}
