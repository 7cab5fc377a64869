mod config;
pub use config::{IdleTimeout, PoolConfig};

mod error;
pub use error::{BorrowError, ConfigError, ReturnError};

mod evictor;

mod idle;

mod pool;
pub(crate) use pool::Shared;
pub use pool::{Borrowed, Pool};

mod stats;
pub use stats::PoolStatsSnapshot;

mod wait;
pub use wait::WaitPolicy;
