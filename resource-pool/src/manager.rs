use std::fmt::{self, Debug, Formatter};

use crate::resource::ResourceInfo;

/// Supplies the pool with resources and decides their fate.
///
/// The pool never inspects a resource itself: creation, liveness checks and
/// teardown all go through this trait.
pub trait ResourceManager: Send + Sync + 'static {
    type Resource: Send + 'static;
    type Error: Debug + Send + 'static;

    /// Create a new resource. Failures are retried by the pool up to the
    /// configured retry count.
    fn create(&self) -> Result<Self::Resource, Self::Error>;

    /// Check whether a resource is still usable. Only called when
    /// validate-on-borrow or validate-on-return is enabled.
    fn validate(&self, _resource: &mut Self::Resource, _info: &ResourceInfo) -> bool {
        true
    }

    /// Tear down a resource which is leaving the pool. Errors are logged by
    /// the pool and never reach a borrower.
    fn invalidate(
        &self,
        resource: Self::Resource,
        _info: &ResourceInfo,
    ) -> Result<(), Self::Error> {
        drop(resource);
        Ok(())
    }
}

type CreateFn<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;
type ValidateFn<T> = Box<dyn Fn(&mut T, &ResourceInfo) -> bool + Send + Sync>;
type InvalidateFn<T, E> = Box<dyn Fn(T, &ResourceInfo) -> Result<(), E> + Send + Sync>;

/// A `ResourceManager` assembled from closures.
pub struct ManagerFn<T, E> {
    create: CreateFn<T, E>,
    validate: Option<ValidateFn<T>>,
    invalidate: Option<InvalidateFn<T, E>>,
}

impl<T, E> ManagerFn<T, E> {
    pub fn new<C>(create: C) -> Self
    where
        C: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            create: Box::new(create),
            validate: None,
            invalidate: None,
        }
    }

    pub fn validate_with<V>(mut self, validate: V) -> Self
    where
        V: Fn(&mut T, &ResourceInfo) -> bool + Send + Sync + 'static,
    {
        self.validate.replace(Box::new(validate));
        self
    }

    pub fn invalidate_with<F>(mut self, invalidate: F) -> Self
    where
        F: Fn(T, &ResourceInfo) -> Result<(), E> + Send + Sync + 'static,
    {
        self.invalidate.replace(Box::new(invalidate));
        self
    }
}

impl<T, E> ResourceManager for ManagerFn<T, E>
where
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    type Resource = T;
    type Error = E;

    fn create(&self) -> Result<T, E> {
        (self.create)()
    }

    fn validate(&self, resource: &mut T, info: &ResourceInfo) -> bool {
        match self.validate.as_ref() {
            Some(validate) => (validate)(resource, info),
            None => true,
        }
    }

    fn invalidate(&self, resource: T, info: &ResourceInfo) -> Result<(), E> {
        match self.invalidate.as_ref() {
            Some(invalidate) => (invalidate)(resource, info),
            None => Ok(()),
        }
    }
}

impl<T, E> Debug for ManagerFn<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerFn")
            .field("validate", &self.validate.is_some())
            .field("invalidate", &self.invalidate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::EntryId;

    #[test]
    fn closure_manager_defaults() {
        let mgr = ManagerFn::<u32, ()>::new(|| Ok(7));
        let info = ResourceInfo::new(EntryId::next());
        let mut res = mgr.create().unwrap();
        assert_eq!(res, 7);
        assert!(mgr.validate(&mut res, &info));
        assert_eq!(mgr.invalidate(res, &info), Ok(()));
    }

    #[test]
    fn closure_manager_hooks() {
        let mgr = ManagerFn::<u32, &'static str>::new(|| Err("down"))
            .validate_with(|res, _| *res > 10)
            .invalidate_with(|_, _| Err("teardown"));
        let info = ResourceInfo::new(EntryId::next());
        assert_eq!(mgr.create(), Err("down"));
        assert!(!mgr.validate(&mut 3, &info));
        assert!(mgr.validate(&mut 11, &info));
        assert_eq!(mgr.invalidate(1, &info), Err("teardown"));
    }
}
