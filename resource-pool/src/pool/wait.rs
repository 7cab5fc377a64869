use std::time::{Duration, Instant};

/// The longest a blocked borrower sleeps before re-checking the pool.
pub(crate) const WAIT_SLICE: Duration = Duration::from_millis(100);

/// How `borrow` behaves when no resource is idle and the pool is full.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Give up immediately, returning `Ok(None)`.
    NoWait,
    /// Wait up to the given duration, then fail with `BorrowTimeout`.
    Timeout(Duration),
    /// Wait until a resource becomes available or the pool is closed.
    Forever,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::Timeout(Duration::from_secs(30))
    }
}

impl WaitPolicy {
    pub(crate) fn start(self) -> Wait {
        let started = Instant::now();
        match self {
            Self::NoWait => Wait::Never,
            Self::Timeout(dur) => Wait::Until(started + dur),
            Self::Forever => Wait::Always,
        }
    }
}

/// The state of an in-progress blocking borrow.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Wait {
    Never,
    Until(Instant),
    Always,
}

impl Wait {
    /// The instant to sleep until before polling again, or `None` if the
    /// wait is over.
    pub fn next_wake(&self) -> Option<Instant> {
        let now = Instant::now();
        match *self {
            Self::Never => None,
            Self::Until(deadline) if deadline <= now => None,
            Self::Until(deadline) => Some(std::cmp::min(deadline, now + WAIT_SLICE)),
            Self::Always => Some(now + WAIT_SLICE),
        }
    }
}
