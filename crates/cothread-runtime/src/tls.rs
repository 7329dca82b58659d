//! Thread-local identity of the running coroutine
//!
//! Kept outside the scheduler cell so `current_coroutine_id` never needs a
//! borrow, and can be called from anywhere, including drop glue.

use cothread_core::id::CoroutineId;
use cothread_core::kprint;
use std::cell::Cell;

thread_local! {
    static CURRENT_COROUTINE: Cell<u32> = const { Cell::new(0) };
}

/// Record the coroutine now holding the CPU (`MAIN` for the main context)
#[inline]
pub fn set_current_coroutine(id: CoroutineId) {
    CURRENT_COROUTINE.with(|cell| cell.set(id.as_u32()));
    kprint::set_coroutine_tag(id.as_u32());
}

#[inline]
pub fn current_coroutine_id() -> CoroutineId {
    CoroutineId::new(CURRENT_COROUTINE.with(|cell| cell.get()))
}

#[inline]
pub fn is_in_coroutine() -> bool {
    !current_coroutine_id().is_main()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_main() {
        assert_eq!(current_coroutine_id(), CoroutineId::MAIN);
        assert!(!is_in_coroutine());
    }

    #[test]
    fn test_set_updates_log_tag() {
        set_current_coroutine(CoroutineId::new(9));
        assert!(is_in_coroutine());
        assert_eq!(kprint::coroutine_tag(), 9);
        set_current_coroutine(CoroutineId::MAIN);
        assert_eq!(kprint::coroutine_tag(), 0);
    }
}
