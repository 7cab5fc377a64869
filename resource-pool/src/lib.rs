//! A bounded, thread-safe pool of reusable resources.
//!
//! Resources are created, validated and torn down by a [`ResourceManager`].
//! Borrowers receive a [`Lease`] which returns the resource to the pool when
//! released or dropped. Idle resources may be evicted by a background thread
//! after a configurable [`IdleTimeout`].

mod manager;
pub use self::manager::{ManagerFn, ResourceManager};

mod pool;
pub use self::pool::{
    BorrowError, Borrowed, ConfigError, IdleTimeout, Pool, PoolConfig, PoolStatsSnapshot,
    ReturnError, WaitPolicy,
};

mod resource;
pub use self::resource::{EntryId, Lease, ResourceInfo};
