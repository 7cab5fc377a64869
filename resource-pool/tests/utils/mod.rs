use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use resource_pool::{ResourceInfo, ResourceManager};

pub struct AtomicCounter {
    count: AtomicUsize,
}

#[allow(unused)]
impl AtomicCounter {
    pub fn new(val: usize) -> Self {
        Self {
            count: AtomicUsize::new(val),
        }
    }

    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn decrement(&self) -> usize {
        self.count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn value(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Decrement if above zero, returning whether a decrement happened.
    pub fn try_consume(&self) -> bool {
        self.count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1))
            .is_ok()
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Hands out increasing integers and records what happens to them.
#[derive(Default)]
pub struct CountingManager {
    pub source: AtomicCounter,
    pub create_calls: AtomicCounter,
    disposed: Mutex<Vec<usize>>,
    fail_creates: AtomicCounter,
    rejected: Mutex<HashSet<usize>>,
}

#[allow(unused)]
impl CountingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `create` fail.
    pub fn failing(count: usize) -> Self {
        let mgr = Self::default();
        mgr.fail_creates.count.store(count, Ordering::SeqCst);
        mgr
    }

    /// Make `validate` fail for the given resource value.
    pub fn reject(&self, value: usize) {
        self.rejected.lock().unwrap().insert(value);
    }

    pub fn invalidated(&self) -> Vec<usize> {
        self.disposed.lock().unwrap().clone()
    }

    /// Resources created and not yet invalidated.
    pub fn live(&self) -> usize {
        self.source.value() - self.disposed.lock().unwrap().len()
    }
}

impl ResourceManager for CountingManager {
    type Resource = usize;
    type Error = &'static str;

    fn create(&self) -> Result<usize, &'static str> {
        self.create_calls.increment();
        if self.fail_creates.try_consume() {
            Err("connection refused")
        } else {
            Ok(self.source.increment())
        }
    }

    fn validate(&self, resource: &mut usize, _info: &ResourceInfo) -> bool {
        !self.rejected.lock().unwrap().contains(resource)
    }

    fn invalidate(&self, resource: usize, _info: &ResourceInfo) -> Result<(), &'static str> {
        self.disposed.lock().unwrap().push(resource);
        Ok(())
    }
}
