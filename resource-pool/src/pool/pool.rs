use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use super::config::{IdleTimeout, PoolConfig};
use super::error::{BorrowError, ConfigError, ReturnError};
use super::evictor::IdleEvictor;
use super::idle::{Claimed, IdleSet};
use super::stats::{PoolStats, PoolStatsSnapshot};
use super::wait::{Wait, WaitPolicy};
use crate::manager::ResourceManager;
use crate::resource::{Entry, EntryId, Lease, ResourceInfo};

type Resource<M> = <M as ResourceManager>::Resource;

/// The result of a borrow: `Ok(None)` means no resource was available under
/// a no-wait policy.
pub type Borrowed<M> = Result<Option<Lease<M>>, BorrowError<<M as ResourceManager>::Error>>;

pub(crate) struct Shared<M: ResourceManager> {
    config: PoolConfig,
    create_lock: Mutex<()>,
    entries: Mutex<HashMap<EntryId, Arc<Entry<Resource<M>>>>>,
    evictor: Option<IdleEvictor<Resource<M>>>,
    // the closed flag; borrow and return hold the read side, close the write side
    gate: RwLock<bool>,
    idle: IdleSet<Resource<M>>,
    manager: M,
    size: AtomicUsize,
    stats: PoolStats,
}

impl<M: ResourceManager> Shared<M> {
    fn new(config: PoolConfig, manager: M) -> Self {
        let evictor = match config.idle_timeout {
            IdleTimeout::After(timeout) => {
                Some(IdleEvictor::new(timeout, config.idle_check_interval))
            }
            IdleTimeout::Never | IdleTimeout::Always => None,
        };
        Self {
            create_lock: Mutex::new(()),
            entries: Mutex::new(HashMap::with_capacity(config.max_size)),
            evictor,
            gate: RwLock::new(false),
            idle: IdleSet::new(),
            manager,
            size: AtomicUsize::new(0),
            stats: PoolStats::new(),
            config,
        }
    }

    fn start_evictor(self: &Arc<Self>) -> Result<(), ConfigError> {
        if let Some(evictor) = self.evictor.as_ref() {
            let worker = self.clone();
            let handle = thread::Builder::new()
                .name("resource-pool-evictor".to_owned())
                .spawn(move || {
                    if let Some(evictor) = worker.evictor.as_ref() {
                        evictor.run(|entry, returned_at| worker.expire_idle(entry, returned_at));
                    }
                })
                .map_err(|err| ConfigError(format!("failed to start idle evictor: {}", err)))?;
            evictor.set_handle(handle);
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    fn borrow(self: &Arc<Self>, wait: WaitPolicy) -> Borrowed<M> {
        let wait = wait.start();
        loop {
            // Listen before trying, so a return in between wakes us.
            let listener = self.idle.listen();
            {
                let closed = self.gate.read();
                if *closed {
                    return Err(BorrowError::PoolClosed);
                }
                if let Some(lease) = self.try_borrow()? {
                    return Ok(Some(lease));
                }
            }
            if let Wait::Never = wait {
                return Ok(None);
            }
            match wait.next_wake() {
                Some(wake_at) => {
                    listener.wait_deadline(wake_at);
                }
                None => return Err(BorrowError::BorrowTimeout),
            }
        }
    }

    /// Take an idle resource or create one, without blocking on capacity.
    fn try_borrow(self: &Arc<Self>) -> Borrowed<M> {
        loop {
            let (entry, mut resource, info) = match self.idle.try_claim() {
                Some(claimed) => claimed,
                None => match self.try_create()? {
                    Some(created) => created,
                    None => return Ok(None),
                },
            };
            if self.config.validate_on_borrow && !self.manager.validate(&mut resource, &info) {
                tracing::debug!(entry = %info.id, "resource failed validation on borrow");
                entry.lock().retire();
                self.invalidate(resource, info);
                continue;
            }
            self.stats.record_borrowed();
            return Ok(Some(Lease::new(resource, info, self.clone())));
        }
    }

    fn try_create(&self) -> Result<Option<Claimed<Resource<M>>>, BorrowError<M::Error>> {
        let max = self.config.max_size;
        if self.size() >= max {
            return Ok(None);
        }
        let _section = self.create_lock.lock();
        // Another borrower may have filled the pool while we waited.
        if self.size() >= max {
            return Ok(None);
        }

        let resource = self.create_with_retry().map_err(BorrowError::CreationFailed)?;
        let entry = Arc::new(Entry::borrowed(EntryId::next()));
        let info = entry.lock().info;
        self.entries.lock().insert(entry.id(), entry.clone());
        let size = self.size.fetch_add(1, Ordering::AcqRel) + 1;
        self.stats.record_created();
        tracing::debug!(entry = %info.id, size, "created resource");
        Ok(Some((entry, resource, info)))
    }

    fn create_with_retry(&self) -> Result<Resource<M>, M::Error> {
        let mut attempt = 0;
        loop {
            match self.manager.create() {
                Ok(resource) => break Ok(resource),
                Err(err) => {
                    self.stats.record_create_failure();
                    if attempt >= self.config.create_retry_count {
                        tracing::warn!(attempt, error = ?err, "resource creation failed");
                        break Err(err);
                    }
                    tracing::debug!(attempt, error = ?err, "resource creation failed, retrying");
                    attempt += 1;
                }
            }
        }
    }

    pub fn restore(&self, id: EntryId, mut resource: Resource<M>) -> Result<(), ReturnError> {
        let closed = self.gate.read();
        let entry = self
            .entries
            .lock()
            .get(&id)
            .cloned()
            .ok_or(ReturnError::UnknownResource(id))?;

        let mut slot = entry.lock();
        if !slot.borrowed {
            return Err(ReturnError::DoubleReturn(id));
        }
        self.stats.record_returned();

        let keep = !*closed
            && self.config.idle_timeout != IdleTimeout::Always
            && (!self.config.validate_on_return
                || self.manager.validate(&mut resource, &slot.info));
        if !keep {
            slot.retire();
            let info = slot.info;
            drop(slot);
            self.invalidate(resource, info);
            return Ok(());
        }

        let returned_at = slot.park(resource);
        drop(slot);
        self.idle.push(entry.clone());
        if let Some(evictor) = self.evictor.as_ref() {
            evictor.watch(entry, returned_at);
        }
        Ok(())
    }

    fn expire_idle(&self, entry: &Entry<Resource<M>>, returned_at: Instant) {
        if let Some((resource, info)) = self.idle.expire(entry, returned_at) {
            tracing::debug!(
                entry = %info.id,
                idle_ms = returned_at.elapsed().as_millis() as u64,
                "evicting idle resource"
            );
            self.invalidate(resource, info);
        }
    }

    /// Drop the entry from tracking and hand the resource to the manager.
    /// The caller must already have retired the entry's slot.
    fn invalidate(&self, resource: Resource<M>, info: ResourceInfo) {
        if self.entries.lock().remove(&info.id).is_some() {
            self.size.fetch_sub(1, Ordering::AcqRel);
            self.idle.notify_one();
        }
        self.stats.record_invalidated();
        if let Err(err) = self.manager.invalidate(resource, &info) {
            tracing::warn!(entry = %info.id, error = ?err, "failed to invalidate resource");
        }
    }

    pub fn close(&self) {
        {
            let mut closed = self.gate.write();
            if *closed {
                return;
            }
            *closed = true;
            let drained = self.idle.drain();
            tracing::debug!(
                idle = drained.len(),
                borrowed = self.size().saturating_sub(drained.len()),
                "closing resource pool"
            );
            for (_, resource, info) in drained {
                self.invalidate(resource, info);
            }
        }
        self.idle.notify_all();
        if let Some(evictor) = self.evictor.as_ref() {
            evictor.stop();
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.gate.read()
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot(self.size(), self.idle.len())
    }
}

struct PoolHandle<M: ResourceManager> {
    shared: Arc<Shared<M>>,
}

impl<M: ResourceManager> Drop for PoolHandle<M> {
    fn drop(&mut self) {
        // The last pool handle is gone: nobody can borrow again.
        self.shared.close();
    }
}

/// A bounded pool of resources of type `M::Resource`.
///
/// Cloning a `Pool` is cheap and shares the underlying resources. The pool
/// is closed when the last clone is dropped; leases still outstanding at
/// that point are invalidated as they are returned.
pub struct Pool<M: ResourceManager> {
    inner: Arc<PoolHandle<M>>,
}

impl<M: ResourceManager> Pool<M> {
    pub(crate) fn new(config: PoolConfig, manager: M) -> Result<Self, ConfigError> {
        let shared = Arc::new(Shared::new(config, manager));
        shared.start_evictor()?;
        Ok(Self {
            inner: Arc::new(PoolHandle { shared }),
        })
    }

    /// Borrow a resource using the configured wait policy.
    pub fn acquire(&self) -> Borrowed<M> {
        self.borrow(self.inner.shared.config.wait)
    }

    /// Borrow a resource, waiting according to `wait` if the pool is
    /// exhausted.
    ///
    /// Returns `Ok(None)` only for [`WaitPolicy::NoWait`].
    pub fn borrow(&self, wait: WaitPolicy) -> Borrowed<M> {
        self.inner.shared.borrow(wait)
    }

    /// Return a leased resource to the pool.
    ///
    /// A lease issued by a different pool is rejected with
    /// `UnknownResource` and goes back to its own pool when dropped.
    pub fn release(&self, mut lease: Lease<M>) -> Result<(), ReturnError> {
        let id = Lease::id(&lease);
        if !lease.belongs_to(&self.inner.shared) {
            return Err(ReturnError::UnknownResource(id));
        }
        match lease.take_parts() {
            Some((shared, resource)) => shared.restore(id, resource),
            None => Ok(()),
        }
    }

    /// Return a resource previously split from its lease with
    /// [`Lease::detach`]. A rejected resource is dropped.
    pub fn restore(&self, id: EntryId, resource: M::Resource) -> Result<(), ReturnError> {
        let result = self.inner.shared.restore(id, resource);
        if let Err(err) = &result {
            tracing::warn!(entry = %id, error = %err, "rejected returned resource");
        }
        result
    }

    /// Close the pool, invalidating idle resources. Safe to call repeatedly.
    pub fn close(&self) {
        self.inner.shared.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shared.is_closed()
    }

    /// Fetch the current number of tracked resources, borrowed and idle.
    pub fn size(&self) -> usize {
        self.inner.shared.size()
    }

    pub fn idle_count(&self) -> usize {
        self.inner.shared.idle.len()
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.inner.shared.stats()
    }

    pub fn manager(&self) -> &M {
        &self.inner.shared.manager
    }
}

impl<M: ResourceManager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: ResourceManager> Debug for Pool<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}
