use std::fmt::{self, Debug, Display, Formatter};

use thiserror::Error;

use crate::resource::EntryId;

/// An error while borrowing a resource from the pool.
pub enum BorrowError<E> {
    /// The resource pool is closed
    PoolClosed,
    /// The wait for an available resource timed out
    BorrowTimeout,
    /// The resource manager failed to create a resource after all retries
    CreationFailed(E),
}

impl<E> BorrowError<E> {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::PoolClosed)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::BorrowTimeout)
    }

    /// Extract the manager error, if creation failed.
    pub fn into_creation_error(self) -> Option<E> {
        match self {
            Self::CreationFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl<E: Debug> Debug for BorrowError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self {
            Self::PoolClosed => write!(f, "BorrowError::PoolClosed"),
            Self::BorrowTimeout => write!(f, "BorrowError::BorrowTimeout"),
            Self::CreationFailed(err) => f
                .debug_tuple("BorrowError::CreationFailed")
                .field(err)
                .finish(),
        }
    }
}

impl<E: Display> Display for BorrowError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self {
            Self::PoolClosed => write!(f, "The resource pool is closed"),
            Self::BorrowTimeout => write!(f, "Timed out waiting for a resource"),
            Self::CreationFailed(err) => write!(f, "Resource creation failed: {}", err),
        }
    }
}

impl<E: Debug + Display> std::error::Error for BorrowError<E> {}

impl<E: PartialEq> PartialEq for BorrowError<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PoolClosed, Self::PoolClosed) => true,
            (Self::BorrowTimeout, Self::BorrowTimeout) => true,
            (Self::CreationFailed(a), Self::CreationFailed(b)) => a == b,
            _ => false,
        }
    }
}

/// An error while returning a resource to the pool.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReturnError {
    #[error("resource {0} is not tracked by this pool")]
    UnknownResource(EntryId),
    #[error("resource {0} was already returned")]
    DoubleReturn(EntryId),
}

/// A configuration error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Config error: {0}")]
pub struct ConfigError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrow_error_display() {
        let err = BorrowError::CreationFailed("refused");
        assert_eq!(err.to_string(), "Resource creation failed: refused");
        assert!(BorrowError::<()>::PoolClosed.is_closed());
        assert!(BorrowError::<()>::BorrowTimeout.is_timeout());
        assert_eq!(err.into_creation_error(), Some("refused"));
    }

    #[test]
    fn return_error_display() {
        let id = EntryId::next();
        let msg = ReturnError::DoubleReturn(id).to_string();
        assert!(msg.ends_with("was already returned"));
    }
}
