//! Runtime configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (runtime)
//! 2. User's config file named by `COT_CONFIG_RS` (compile-time)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use cothread_runtime::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env()
//!     .stack_size(256 * 1024)
//!     .debug_logging(true);
//! ```

pub mod defaults;

use cothread_core::constants::MIN_STACK_SIZE;
use cothread_core::env::{env_get, env_get_bool};
use cothread_core::error::SchedError;
use cothread_core::kprintln;

/// Scheduler configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Usable stack bytes per coroutine (rounded up to the page size)
    pub stack_size: usize,
    /// Place an inaccessible page below each stack
    pub guard_page: bool,
    /// Log scheduler transitions at debug level
    pub debug_logging: bool,
    /// Initial capacity of the registry and ready queue
    pub registry_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RuntimeConfig {
    /// Compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `COT_STACK_SIZE` - Stack bytes per coroutine
    /// - `COT_GUARD_PAGE` - Guard page below each stack (0/1)
    /// - `COT_DEBUG` - Debug logging of scheduler transitions (0/1)
    /// - `COT_REGISTRY_CAPACITY` - Initial registry capacity
    pub fn from_env() -> Self {
        Self {
            stack_size: env_get("COT_STACK_SIZE", defaults::STACK_SIZE),
            guard_page: env_get_bool("COT_GUARD_PAGE", defaults::GUARD_PAGE),
            debug_logging: env_get_bool("COT_DEBUG", defaults::DEBUG_LOGGING),
            registry_capacity: env_get("COT_REGISTRY_CAPACITY", defaults::REGISTRY_CAPACITY),
        }
    }

    /// Compile-time defaults only, no environment lookup.
    pub fn new() -> Self {
        Self {
            stack_size: defaults::STACK_SIZE,
            guard_page: defaults::GUARD_PAGE,
            debug_logging: defaults::DEBUG_LOGGING,
            registry_capacity: defaults::REGISTRY_CAPACITY,
        }
    }

    // Builder methods

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn guard_page(mut self, enable: bool) -> Self {
        self.guard_page = enable;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    pub fn registry_capacity(mut self, cap: usize) -> Self {
        self.registry_capacity = cap;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be >= 16KB"));
        }
        if self.stack_size > isize::MAX as usize / 2 {
            return Err(ConfigError::InvalidValue("stack_size is too large"));
        }
        if self.registry_capacity == 0 {
            return Err(ConfigError::InvalidValue("registry_capacity must be > 0"));
        }
        Ok(())
    }

    pub fn print(&self) {
        kprintln!("cothread configuration:");
        kprintln!("  stack_size:         {}", self.stack_size);
        kprintln!("  guard_page:         {}", self.guard_page);
        kprintln!("  debug_logging:      {}", self.debug_logging);
        kprintln!("  registry_capacity:  {}", self.registry_capacity);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for SchedError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => SchedError::InvalidConfig(msg),
        }
    }
}
