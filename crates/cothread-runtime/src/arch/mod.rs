//! Architecture-specific context switching
//!
//! Each architecture provides the same three items:
//!
//! - `SavedRegs` - callee-saved register file, resume address and stack pointer
//! - `init_context` - prepare a fresh `SavedRegs` so that switching to it
//!   calls `entry_fn(entry_arg)` on the given stack
//! - `context_switch` - save the current registers, load another set
//!
//! Nothing outside `crate::context` calls into these modules.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
    }
}
