//! Execution contexts
//!
//! The one place the scheduler touches architecture code. An
//! [`ExecutionContext`] is either empty (a slot the current call stack is
//! saved into on the next transfer, like the main context) or prepared to
//! start a coroutine entry point on a [`Stack`].

use crate::current_arch::{self, SavedRegs};
use crate::memory::Stack;

/// Entry point run on a fresh stack; receives one machine word
pub type EntryPoint = extern "C" fn(usize) -> !;

/// Opaque saved execution state
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct ExecutionContext {
    regs: SavedRegs,
}

impl ExecutionContext {
    /// Context with nothing saved yet
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context that runs `entry(arg)` on `stack` when first transferred to
    pub fn prepare(stack: &Stack, entry: EntryPoint, arg: usize) -> Self {
        let mut ctx = Self::empty();
        unsafe {
            current_arch::init_context(&mut ctx.regs, stack.top(), entry as usize, arg);
        }
        ctx
    }

    /// Save the running call stack into `from` and continue at `to`.
    ///
    /// Returns once another transfer names `from` as its destination.
    ///
    /// # Safety
    ///
    /// Both pointers must stay valid until control comes back, `to` must
    /// be prepared or previously saved, and its stack must still be mapped.
    /// No Rust reference to either context may be alive across the call.
    #[inline]
    pub unsafe fn transfer(from: *mut ExecutionContext, to: *const ExecutionContext) {
        current_arch::context_switch(from.cast::<SavedRegs>(), to.cast::<SavedRegs>());
    }
}
