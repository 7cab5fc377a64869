use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use concurrent_queue::ConcurrentQueue;
use event_listener::Event;
use parking_lot::Mutex;

use crate::resource::{Entry, EntryId};

/// A pending idle check for one returned entry.
struct Watch<T> {
    entry: Arc<Entry<T>>,
    returned_at: Instant,
}

/// Background eviction of resources left idle past the idle timeout.
///
/// Every return arms a check, kept in a timer map on a single thread. Each
/// entry has at most one pending check: a later return replaces it. When a
/// check fires the entry is only expired if it has not been borrowed or
/// returned again since the check was armed.
pub(crate) struct IdleEvictor<T> {
    check_interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
    pending: AtomicUsize,
    register_inject: ConcurrentQueue<Watch<T>>,
    running: AtomicBool,
    timeout: Duration,
    wake: Event,
}

impl<T> IdleEvictor<T> {
    pub fn new(timeout: Duration, check_interval: Duration) -> Self {
        Self {
            check_interval,
            handle: Mutex::new(None),
            pending: AtomicUsize::new(0),
            register_inject: ConcurrentQueue::unbounded(),
            running: AtomicBool::new(true),
            timeout,
            wake: Event::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The number of armed checks as of the last pass of the evictor loop.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn set_handle(&self, handle: JoinHandle<()>) {
        self.handle.lock().replace(handle);
    }

    /// Arm an idle check for an entry returned at `returned_at`.
    pub fn watch(&self, entry: Arc<Entry<T>>, returned_at: Instant) {
        if !self.is_running() {
            return;
        }
        // The queue is never closed or full, so this should not fail.
        self.register_inject
            .push(Watch { entry, returned_at })
            .unwrap_or(());
        self.wake.notify(1);
    }

    /// The evictor thread body. `expire` is called for each check that
    /// comes due and decides whether the entry is still eligible.
    pub fn run<F>(&self, mut expire: F)
    where
        F: FnMut(&Arc<Entry<T>>, Instant),
    {
        // Mark the evictor stopped when this thread exits, whether normally
        // or due to a panic in the resource manager.
        let _guard = StopOnExit(&self.running);
        let mut timers = BTreeMap::<(Instant, u64), Watch<T>>::new();
        let mut due_at = HashMap::<EntryId, Instant>::new();

        loop {
            let listener = self.wake.listen();
            if !self.is_running() {
                break;
            }

            while let Ok(watch) = self.register_inject.pop() {
                let id = watch.entry.id();
                let due = watch.returned_at + self.timeout;
                match due_at.get(&id).copied() {
                    // registered out of order, a later return is already armed
                    Some(prev) if prev > due => continue,
                    Some(prev) => {
                        timers.remove(&(prev, id.as_u64()));
                    }
                    None => (),
                }
                due_at.insert(id, due);
                timers.insert((due, id.as_u64()), watch);
            }

            let now = Instant::now();
            let remain_timers = timers.split_off(&(now, 0));
            for (_, watch) in std::mem::replace(&mut timers, remain_timers) {
                due_at.remove(&watch.entry.id());
                expire(&watch.entry, watch.returned_at);
            }
            self.pending.store(timers.len(), Ordering::Release);

            let mut next_check = now + self.check_interval;
            if let Some((due, _)) = timers.keys().next() {
                next_check = std::cmp::min(next_check, *due);
            }
            listener.wait_deadline(next_check);
        }

        tracing::debug!(pending = timers.len(), "idle evictor stopped");
    }

    /// Stop the evictor thread and wait for it to exit.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.wake.notify(usize::MAX);
        while self.register_inject.pop().is_ok() {}

        if let Some(handle) = self.handle.lock().take() {
            // a pool closed from inside the manager's invalidate hook
            // runs on the evictor thread itself
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("idle evictor thread panicked");
            }
        }
    }
}

struct StopOnExit<'a>(&'a AtomicBool);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
