//! Coroutine stack memory
//!
//! Each coroutine owns one [`Stack`]: an anonymous private mapping with an
//! optional inaccessible guard page at its low end. Stacks grow down, so an
//! overflow runs into the guard page and faults instead of silently
//! corrupting a neighbouring mapping.
//!
//! ```text
//!  base                 base + guard                       base + len
//!   │ guard (PROT_NONE) │ usable stack (RW)  ◄── grows down ── │ top
//! ```

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
    } else {
        compile_error!("cothread stacks require a unix platform");
    }
}

use cothread_core::constants::{FALLBACK_PAGE_SIZE, STACK_ALIGN};
use cothread_core::error::{MemoryError, SchedResult};

/// Owned execution stack, unmapped on drop
pub struct Stack {
    /// Start of the whole mapping (guard page included)
    base: *mut u8,
    /// Total mapping length
    len: usize,
    /// Bytes of guard at the low end (0 if disabled)
    guard: usize,
}

impl Stack {
    /// Map a stack with at least `size` usable bytes.
    ///
    /// `size` is rounded up to the page size.
    pub fn new(size: usize, guard_page: bool) -> SchedResult<Stack> {
        let page = page_size();
        if size == 0 {
            return Err(MemoryError::InvalidSize(size).into());
        }
        let usable = size
            .checked_add(page - 1)
            .map(|n| n & !(page - 1))
            .ok_or(MemoryError::InvalidSize(size))?;
        let guard = if guard_page { page } else { 0 };
        let len = usable
            .checked_add(guard)
            .ok_or(MemoryError::InvalidSize(size))?;

        let base = unix::map_stack(len, guard)?;
        Ok(Stack { base, len, guard })
    }

    /// Highest address of the stack, aligned for the ABI
    #[inline]
    pub fn top(&self) -> *mut u8 {
        let end = self.base as usize + self.len;
        (end & !(STACK_ALIGN - 1)) as *mut u8
    }

    /// Lowest usable address (just above the guard page)
    #[inline]
    pub fn bottom(&self) -> *mut u8 {
        unsafe { self.base.add(self.guard) }
    }

    #[inline]
    pub fn usable_size(&self) -> usize {
        self.len - self.guard
    }

    #[inline]
    pub fn has_guard(&self) -> bool {
        self.guard != 0
    }

    /// Whether `addr` lies inside the usable part of this stack
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.bottom() as usize && addr < self.base as usize + self.len
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unix::unmap_stack(self.base, self.len);
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("bottom", &self.bottom())
            .field("top", &self.top())
            .field("usable", &self.usable_size())
            .field("guard", &self.guard)
            .finish()
    }
}

/// System page size
pub fn page_size() -> usize {
    use nix::unistd::{sysconf, SysconfVar};

    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(n)) if n > 0 => n as usize,
        _ => FALLBACK_PAGE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(page_size().is_power_of_two());
    }

    #[test]
    fn test_size_rounds_to_page() {
        let stack = Stack::new(1, false).unwrap();
        assert_eq!(stack.usable_size(), page_size());
        assert!(!stack.has_guard());
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            Stack::new(0, true),
            Err(cothread_core::SchedError::Memory(MemoryError::InvalidSize(0)))
        ));
    }

    #[test]
    fn test_stack_is_writable_end_to_end() {
        let stack = Stack::new(64 * 1024, true).unwrap();
        assert!(stack.has_guard());
        assert!(stack.usable_size() >= 64 * 1024);
        assert_eq!(stack.top() as usize % STACK_ALIGN, 0);
        assert!(stack.contains(stack.bottom() as usize));
        assert!(!stack.contains(stack.bottom() as usize - 1));

        unsafe {
            stack.bottom().write(0xAB);
            stack.top().sub(1).write(0xCD);
            assert_eq!(stack.bottom().read(), 0xAB);
            assert_eq!(stack.top().sub(1).read(), 0xCD);
        }
    }
}
