use std::time::Duration;

use super::error::ConfigError;
use super::pool::Pool;
use super::wait::WaitPolicy;
use crate::manager::ResourceManager;

/// When idle resources are evicted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdleTimeout {
    /// Idle resources are kept until the pool is closed.
    Never,
    /// Resources are invalidated as soon as they are returned.
    Always,
    /// Resources are invalidated once idle for the given duration.
    After(Duration),
}

impl IdleTimeout {
    /// Interpret a millisecond count: negative means never, zero means
    /// always, and a positive value is the idle duration.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            m if m < 0 => Self::Never,
            0 => Self::Always,
            m => Self::After(Duration::from_millis(m as u64)),
        }
    }
}

impl Default for IdleTimeout {
    fn default() -> Self {
        Self::After(Duration::from_secs(600))
    }
}

/// Settings for a resource pool, consumed by [`PoolConfig::build`].
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub(crate) create_retry_count: usize,
    pub(crate) idle_check_interval: Duration,
    pub(crate) idle_timeout: IdleTimeout,
    pub(crate) max_size: usize,
    pub(crate) validate_on_borrow: bool,
    pub(crate) validate_on_return: bool,
    pub(crate) wait: WaitPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            create_retry_count: 0,
            idle_check_interval: Duration::from_secs(1),
            idle_timeout: IdleTimeout::default(),
            max_size: 8,
            validate_on_borrow: false,
            validate_on_return: false,
            wait: WaitPolicy::default(),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of additional creation attempts after a failure.
    pub fn create_retry_count(mut self, val: usize) -> Self {
        self.create_retry_count = val;
        self
    }

    /// The longest the idle evictor sleeps between checks.
    pub fn idle_check_interval(mut self, val: Duration) -> Self {
        self.idle_check_interval = val;
        self
    }

    pub fn idle_timeout(mut self, val: IdleTimeout) -> Self {
        self.idle_timeout = val;
        self
    }

    pub fn max_size(mut self, val: usize) -> Self {
        self.max_size = val;
        self
    }

    pub fn validate_on_borrow(mut self, val: bool) -> Self {
        self.validate_on_borrow = val;
        self
    }

    pub fn validate_on_return(mut self, val: bool) -> Self {
        self.validate_on_return = val;
        self
    }

    /// The wait policy used by [`Pool::acquire`].
    pub fn wait(mut self, val: WaitPolicy) -> Self {
        self.wait = val;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError("max_size must be greater than zero".to_owned()));
        }
        if self.idle_check_interval == Duration::from_secs(0) {
            return Err(ConfigError(
                "idle_check_interval must be greater than zero".to_owned(),
            ));
        }
        if self.wait == WaitPolicy::Timeout(Duration::from_secs(0)) {
            return Err(ConfigError(
                "a zero wait timeout is not allowed, use WaitPolicy::NoWait".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn build<M: ResourceManager>(self, manager: M) -> Result<Pool<M>, ConfigError> {
        self.validate()?;
        Pool::new(self, manager)
    }
}
