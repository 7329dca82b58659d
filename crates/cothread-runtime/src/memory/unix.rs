//! Unix stack mapping using mmap

use cothread_core::error::{MemoryError, SchedResult};
use cothread_core::kwarn;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        const STACK_FLAGS: libc::c_int =
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE | libc::MAP_STACK;
    } else {
        const STACK_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
    }
}

/// Map `len` bytes read/write, then revoke access to the lowest `guard` bytes.
pub(super) fn map_stack(len: usize, guard: usize) -> SchedResult<*mut u8> {
    let base = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            STACK_FLAGS,
            -1,
            0,
        )
    };

    if base == libc::MAP_FAILED {
        return Err(MemoryError::AllocationFailed.into());
    }

    if guard > 0 {
        let ret = unsafe { libc::mprotect(base, guard, libc::PROT_NONE) };
        if ret != 0 {
            unmap_stack(base as *mut u8, len);
            return Err(MemoryError::ProtectionFailed.into());
        }
    }

    Ok(base as *mut u8)
}

pub(super) fn unmap_stack(base: *mut u8, len: usize) {
    let ret = unsafe { libc::munmap(base as *mut libc::c_void, len) };
    if ret != 0 {
        kwarn!("munmap of stack at {:p} ({} bytes) failed", base, len);
    }
}
