//! # cothread-core
//!
//! Core types for the cothread cooperative coroutine scheduler.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Stacks, context switching and the scheduler itself live in
//! `cothread-runtime`.
//!
//! ## Modules
//!
//! - `id` - Coroutine identifier type
//! - `state` - Coroutine lifecycle state machine
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::CoroutineId;
pub use state::CoroutineState;
pub use error::{SchedError, SchedResult, MemoryError};
pub use env::{env_get, env_get_bool, env_get_opt};

/// Constants for stack layout
pub mod constants {
    cfg_if::cfg_if! {
        if #[cfg(feature = "large-stack")] {
            /// Default stack size per coroutine (8 MB)
            pub const DEFAULT_STACK_SIZE: usize = 8 * 1024 * 1024;
        } else {
            /// Default stack size per coroutine (1 MB)
            pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;
        }
    }

    /// Smallest stack the runtime accepts
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Fallback page size when the OS cannot be asked
    pub const FALLBACK_PAGE_SIZE: usize = 4096;

    /// Stack pointer alignment required by every supported ABI
    pub const STACK_ALIGN: usize = 16;

    /// Default initial capacity of the registry and ready queue
    pub const DEFAULT_REGISTRY_CAPACITY: usize = 64;
}
