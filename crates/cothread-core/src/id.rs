//! Coroutine identifier type

use core::fmt;

/// Unique identifier for a coroutine
///
/// Identities are assigned from 1 upward and never reused by a scheduler.
/// The value 0 is reserved for the main execution context, the thread's
/// call stack that is not a coroutine at all.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CoroutineId(u32);

impl CoroutineId {
    /// The main execution context
    pub const MAIN: CoroutineId = CoroutineId(0);

    /// First identity handed to a user coroutine
    pub const FIRST: CoroutineId = CoroutineId(1);

    /// Create a new CoroutineId from a raw value
    #[inline]
    pub const fn new(id: u32) -> Self {
        CoroutineId(id)
    }

    /// Get the raw u32 value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get as usize (trampoline argument)
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the main context
    #[inline]
    pub const fn is_main(self) -> bool {
        self.0 == 0
    }

    /// Identity following this one
    ///
    /// Returns `None` once the 32-bit space is used up.
    #[inline]
    pub const fn next(self) -> Option<CoroutineId> {
        match self.0.checked_add(1) {
            Some(n) => Some(CoroutineId(n)),
            None => None,
        }
    }
}

impl From<u32> for CoroutineId {
    #[inline]
    fn from(id: u32) -> Self {
        CoroutineId(id)
    }
}

impl From<CoroutineId> for u32 {
    #[inline]
    fn from(id: CoroutineId) -> Self {
        id.0
    }
}

impl fmt::Debug for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_main() {
            write!(f, "CoroutineId(MAIN)")
        } else {
            write!(f, "CoroutineId({})", self.0)
        }
    }
}

impl fmt::Display for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_main() {
            write!(f, "main")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for CoroutineId {
    fn default() -> Self {
        CoroutineId::MAIN
    }
}
