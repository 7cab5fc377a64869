use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::{EntryId, ResourceInfo};
use crate::manager::ResourceManager;
use crate::pool::{ReturnError, Shared};

/// Exclusive access to a borrowed resource.
///
/// The resource goes back to its pool when the lease is released or
/// dropped. Helper methods are associated functions (`Lease::id(&lease)`)
/// so they never shadow methods of the resource itself.
pub struct Lease<M: ResourceManager> {
    id: EntryId,
    info: ResourceInfo,
    value: Option<M::Resource>,
    shared: Option<Arc<Shared<M>>>,
}

impl<M: ResourceManager> Lease<M> {
    pub(crate) fn new(value: M::Resource, info: ResourceInfo, shared: Arc<Shared<M>>) -> Self {
        Self {
            id: info.id,
            info,
            value: Some(value),
            shared: Some(shared),
        }
    }

    /// The identity of the leased resource.
    pub fn id(lease: &Self) -> EntryId {
        lease.id
    }

    /// Lifecycle metadata captured when the resource was borrowed.
    pub fn info(lease: &Self) -> &ResourceInfo {
        &lease.info
    }

    /// Return the resource to its pool now, reporting any error.
    pub fn release(mut lease: Self) -> Result<(), ReturnError> {
        match lease.take_parts() {
            Some((shared, value)) => shared.restore(lease.id, value),
            None => Ok(()),
        }
    }

    /// Split the lease into its ticket and the raw resource without
    /// returning it. The pair must later be handed to `Pool::restore`,
    /// otherwise the pool keeps the entry counted as borrowed.
    pub fn detach(mut lease: Self) -> (EntryId, M::Resource) {
        lease.shared.take();
        let value = lease
            .value
            .take()
            .unwrap_or_else(|| unreachable!("lease resource already taken"));
        (lease.id, value)
    }

    pub(crate) fn belongs_to(&self, shared: &Arc<Shared<M>>) -> bool {
        self.shared
            .as_ref()
            .map_or(false, |own| Arc::ptr_eq(own, shared))
    }

    pub(crate) fn take_parts(&mut self) -> Option<(Arc<Shared<M>>, M::Resource)> {
        match (self.shared.take(), self.value.take()) {
            (Some(shared), Some(value)) => Some((shared, value)),
            _ => None,
        }
    }
}

impl<M: ResourceManager> Debug for Lease<M>
where
    M::Resource: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.debug_struct("Lease")
                .field("id", &self.id)
                .field("value", &self.deref())
                .finish()
        } else {
            Debug::fmt(self.deref(), f)
        }
    }
}

impl<M: ResourceManager> Display for Lease<M>
where
    M::Resource: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self.deref(), f)
    }
}

impl<M: ResourceManager> Deref for Lease<M> {
    type Target = M::Resource;
    fn deref(&self) -> &Self::Target {
        // the value is only taken by consuming methods and drop
        self.value
            .as_ref()
            .unwrap_or_else(|| unreachable!("lease resource already taken"))
    }
}

impl<M: ResourceManager> DerefMut for Lease<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value
            .as_mut()
            .unwrap_or_else(|| unreachable!("lease resource already taken"))
    }
}

impl<M: ResourceManager> Drop for Lease<M> {
    fn drop(&mut self) {
        if let Some((shared, value)) = self.take_parts() {
            if let Err(err) = shared.restore(self.id, value) {
                tracing::warn!(entry = %self.id, error = %err, "failed to return dropped lease");
            }
        }
    }
}
