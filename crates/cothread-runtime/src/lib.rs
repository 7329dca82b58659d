//! # cothread-runtime
//!
//! Platform-specific engine of the cothread coroutine scheduler.
//!
//! This crate provides:
//! - Stack memory (mmap with a guard page)
//! - Context switching (architecture-specific assembly)
//! - The coroutine record and its state machine
//! - The per-thread scheduler and its FIFO ready queue
//! - Configuration (compile-time defaults + environment overrides)

pub mod config;
pub mod memory;
pub mod arch;
pub mod context;
pub mod coroutine;
pub mod ready_queue;
pub mod scheduler;
pub mod tls;

// Re-exports
pub use config::{ConfigError, RuntimeConfig};
pub use coroutine::Coroutine;
pub use scheduler::{Scheduler, with_scheduler};

// Architecture detection
cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub use arch::x86_64 as current_arch;
    } else if #[cfg(target_arch = "aarch64")] {
        pub use arch::aarch64 as current_arch;
    } else {
        compile_error!("Unsupported architecture");
    }
}
