//! Coroutine record
//!
//! Owns the stack, the saved context and the not-yet-started user
//! function. Records live boxed in the scheduler's registry so the address
//! of `context` does not move while a transfer holds a pointer to it.

use crate::context::{EntryPoint, ExecutionContext};
use crate::memory::Stack;

use cothread_core::error::SchedResult;
use cothread_core::id::CoroutineId;
use cothread_core::state::CoroutineState;

use std::any::Any;

/// User function, run once on the coroutine's own stack
pub type CoroutineFn = Box<dyn FnOnce() + 'static>;

/// Payload of a panic caught on a coroutine stack
pub type PanicPayload = Box<dyn Any + Send + 'static>;

pub struct Coroutine {
    id: CoroutineId,
    state: CoroutineState,
    context: ExecutionContext,
    func: Option<CoroutineFn>,
    /// Context that resumed us last and gets control back on yield/finish
    resumer: CoroutineId,
    /// Coroutine we resumed and are waiting on
    awaiting: Option<CoroutineId>,
    panic: Option<PanicPayload>,
    /// Dropped last: nothing above may still point into it
    stack: Stack,
}

impl Coroutine {
    /// Allocate a stack and prepare a context that enters `entry(id)`.
    pub fn new(
        id: CoroutineId,
        func: CoroutineFn,
        entry: EntryPoint,
        stack_size: usize,
        guard_page: bool,
    ) -> SchedResult<Box<Coroutine>> {
        let stack = Stack::new(stack_size, guard_page)?;
        let context = ExecutionContext::prepare(&stack, entry, id.as_usize());

        Ok(Box::new(Coroutine {
            id,
            state: CoroutineState::Ready,
            context,
            func: Some(func),
            resumer: CoroutineId::MAIN,
            awaiting: None,
            panic: None,
            stack,
        }))
    }

    #[inline]
    pub fn id(&self) -> CoroutineId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> CoroutineState {
        self.state
    }

    /// Move along the state machine
    #[inline]
    pub fn set_state(&mut self, next: CoroutineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "coroutine {}: illegal transition {} -> {}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    #[inline]
    pub fn resumer(&self) -> CoroutineId {
        self.resumer
    }

    #[inline]
    pub fn set_resumer(&mut self, id: CoroutineId) {
        self.resumer = id;
    }

    #[inline]
    pub fn awaiting(&self) -> Option<CoroutineId> {
        self.awaiting
    }

    #[inline]
    pub fn set_awaiting(&mut self, target: Option<CoroutineId>) {
        self.awaiting = target;
    }

    /// Take the user function. `None` after the first call.
    #[inline]
    pub fn take_func(&mut self) -> Option<CoroutineFn> {
        self.func.take()
    }

    #[inline]
    pub fn set_panic(&mut self, payload: PanicPayload) {
        self.panic = Some(payload);
    }

    #[inline]
    pub fn take_panic(&mut self) -> Option<PanicPayload> {
        self.panic.take()
    }

    /// Raw pointer to the saved context, for a transfer
    #[inline]
    pub fn context_ptr(&mut self) -> *mut ExecutionContext {
        &mut self.context
    }

    #[inline]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }
}

impl std::fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coroutine")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("resumer", &self.resumer)
            .field("awaiting", &self.awaiting)
            .field("stack", &self.stack)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn never_entered(_: usize) -> ! {
        std::process::abort()
    }

    fn record(id: u32) -> Box<Coroutine> {
        Coroutine::new(CoroutineId::new(id), Box::new(|| {}), never_entered, 64 * 1024, true)
            .unwrap()
    }

    #[test]
    fn test_new_record_is_ready() {
        let co = record(4);
        assert_eq!(co.id(), CoroutineId::new(4));
        assert_eq!(co.state(), CoroutineState::Ready);
        assert_eq!(co.resumer(), CoroutineId::MAIN);
        assert!(co.awaiting().is_none());
        assert!(co.stack().usable_size() >= 64 * 1024);
    }

    #[test]
    fn test_func_taken_once() {
        let mut co = record(1);
        assert!(co.take_func().is_some());
        assert!(co.take_func().is_none());
    }

    #[test]
    fn test_lifecycle() {
        let mut co = record(2);
        co.set_state(CoroutineState::Running);
        co.set_state(CoroutineState::HangUp);
        co.set_state(CoroutineState::Running);
        co.set_state(CoroutineState::Dead);
        assert!(co.state().is_terminated());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "illegal transition")]
    fn test_dead_cannot_run_again() {
        let mut co = record(3);
        co.set_state(CoroutineState::Running);
        co.set_state(CoroutineState::Dead);
        co.set_state(CoroutineState::Running);
    }

    #[test]
    fn test_bad_stack_size_fails() {
        let err = Coroutine::new(CoroutineId::new(1), Box::new(|| {}), never_entered, 0, false)
            .unwrap_err();
        assert!(matches!(err, cothread_core::SchedError::Memory(_)));
    }
}
