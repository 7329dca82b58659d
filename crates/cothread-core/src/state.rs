//! Coroutine lifecycle state

use core::fmt;

/// State of a coroutine
///
/// ```text
///   Ready ──► Running ──► Dead
///               │  ▲
///         yield ▼  │ resume
///              HangUp
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoroutineState {
    /// Created, never run
    Ready = 0,

    /// Currently owns the CPU
    Running = 1,

    /// Suspended by yield, resumable
    HangUp = 2,

    /// Function returned, terminal
    Dead = 3,
}

impl CoroutineState {
    /// Whether the scheduler may transfer control into this coroutine
    #[inline]
    pub const fn is_resumable(&self) -> bool {
        matches!(self, CoroutineState::Ready | CoroutineState::HangUp)
    }

    /// Whether the coroutine's function has returned
    #[inline]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, CoroutineState::Dead)
    }

    /// Check a transition against the state machine
    pub const fn can_transition_to(&self, next: CoroutineState) -> bool {
        matches!(
            (self, next),
            (CoroutineState::Ready, CoroutineState::Running)
                | (CoroutineState::Running, CoroutineState::HangUp)
                | (CoroutineState::HangUp, CoroutineState::Running)
                | (CoroutineState::Running, CoroutineState::Dead)
        )
    }
}

impl From<CoroutineState> for u8 {
    fn from(state: CoroutineState) -> u8 {
        state as u8
    }
}

impl fmt::Display for CoroutineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoroutineState::Ready => write!(f, "ready"),
            CoroutineState::Running => write!(f, "running"),
            CoroutineState::HangUp => write!(f, "hang-up"),
            CoroutineState::Dead => write!(f, "dead"),
        }
    }
}
