//! Error types for the coroutine scheduler

use core::fmt;

use crate::id::CoroutineId;
use crate::state::CoroutineState;

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur in scheduler operations
///
/// Every variant is a usage violation, not a transient condition.
/// Nothing here is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// Resume of an identity that was never created or already finished
    UnknownCoroutine(CoroutineId),

    /// Yield called from the main context
    YieldOutsideCoroutine,

    /// Resume of a coroutine that is running or waiting on a nested resume
    InvalidState {
        id: CoroutineId,
        state: CoroutineState,
    },

    /// Operation only valid from the main context
    InCoroutine,

    /// Configuration change after coroutines were created
    AlreadyInitialized,

    /// Identity space used up
    IdsExhausted,

    /// Configuration rejected by validation
    InvalidConfig(&'static str),

    /// Stack allocation/protection failed
    Memory(MemoryError),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::UnknownCoroutine(id) => write!(f, "unknown coroutine {}", id),
            SchedError::YieldOutsideCoroutine => {
                write!(f, "yield called outside of any coroutine")
            }
            SchedError::InvalidState { id, state } => {
                write!(f, "coroutine {} cannot be resumed while {}", id, state)
            }
            SchedError::InCoroutine => write!(f, "operation not allowed inside a coroutine"),
            SchedError::AlreadyInitialized => {
                write!(f, "scheduler already has live coroutines")
            }
            SchedError::IdsExhausted => write!(f, "coroutine identities exhausted"),
            SchedError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            SchedError::Memory(e) => write!(f, "memory error: {}", e),
        }
    }
}

impl std::error::Error for SchedError {}

/// Stack memory errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap failed
    AllocationFailed,

    /// mprotect on the guard page failed
    ProtectionFailed,

    /// Requested size is zero or overflows after page rounding
    InvalidSize(usize),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "stack allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "guard page protection failed"),
            MemoryError::InvalidSize(n) => write!(f, "invalid stack size {}", n),
        }
    }
}

impl std::error::Error for MemoryError {}

impl From<MemoryError> for SchedError {
    fn from(e: MemoryError) -> Self {
        SchedError::Memory(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = SchedError::UnknownCoroutine(CoroutineId::new(3));
        assert_eq!(format!("{}", e), "unknown coroutine 3");

        let e = SchedError::Memory(MemoryError::AllocationFailed);
        assert_eq!(format!("{}", e), "memory error: stack allocation failed");

        let e = SchedError::InvalidState {
            id: CoroutineId::new(2),
            state: CoroutineState::Running,
        };
        assert_eq!(format!("{}", e), "coroutine 2 cannot be resumed while running");
    }

    #[test]
    fn test_error_conversion() {
        let sched_err: SchedError = MemoryError::InvalidSize(0).into();
        assert!(matches!(sched_err, SchedError::Memory(MemoryError::InvalidSize(0))));
    }
}
