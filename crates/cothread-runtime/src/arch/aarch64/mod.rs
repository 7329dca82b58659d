//! aarch64 context switching (AAPCS64)

use cothread_core::constants::STACK_ALIGN;
use std::arch::naked_asm;

/// Registers preserved across a voluntary switch
///
/// ```text
/// 0x00 sp    0x08 pc (resume address)
/// 0x10 x19 .. 0x60 x29 (fp)
/// 0x68 d8  .. 0xA0 d15
/// ```
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SavedRegs {
    pub sp: u64,
    pub pc: u64,
    pub x: [u64; 11],
    pub d: [u64; 8],
}

/// Prepare `regs` so that switching to it runs `entry_fn(entry_arg)` on
/// the stack ending at `stack_top`.
///
/// # Safety
///
/// `stack_top` must be the high end of a mapped, writable stack.
pub unsafe fn init_context(
    regs: &mut SavedRegs,
    stack_top: *mut u8,
    entry_fn: usize,
    entry_arg: usize,
) {
    let sp = stack_top as usize & !(STACK_ALIGN - 1);

    *regs = SavedRegs {
        sp: sp as u64,
        pc: coroutine_trampoline as usize as u64,
        ..SavedRegs::default()
    };
    // x19 = entry, x20 = argument, x29 (frame pointer) = 0
    regs.x[0] = entry_fn as u64;
    regs.x[1] = entry_arg as u64;
}

#[unsafe(naked)]
unsafe extern "C" fn coroutine_trampoline() {
    naked_asm!(
        "mov x0, x20",
        "mov x30, xzr",
        "blr x19",
        "brk #0x1",
    );
}

/// Save callee-saved state into `old`, load it from `new` and branch to
/// the saved resume address.
///
/// The resume address saved for `old` is our own return address, so a
/// later switch back looks like an ordinary return to the caller.
///
/// # Safety
///
/// `new` must hold registers produced by `init_context` or by an earlier
/// `context_switch`, and its stack must still be mapped.
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(_old: *mut SavedRegs, _new: *const SavedRegs) {
    naked_asm!(
        // Save into old (x0)
        "mov x9, sp",
        "stp x9, x30, [x0, #0x00]",
        "stp x19, x20, [x0, #0x10]",
        "stp x21, x22, [x0, #0x20]",
        "stp x23, x24, [x0, #0x30]",
        "stp x25, x26, [x0, #0x40]",
        "stp x27, x28, [x0, #0x50]",
        "str x29, [x0, #0x60]",
        "stp d8, d9, [x0, #0x68]",
        "stp d10, d11, [x0, #0x78]",
        "stp d12, d13, [x0, #0x88]",
        "stp d14, d15, [x0, #0x98]",
        // Load from new (x1)
        "ldp x9, x10, [x1, #0x00]",
        "mov sp, x9",
        "ldp x19, x20, [x1, #0x10]",
        "ldp x21, x22, [x1, #0x20]",
        "ldp x23, x24, [x1, #0x30]",
        "ldp x25, x26, [x1, #0x40]",
        "ldp x27, x28, [x1, #0x50]",
        "ldr x29, [x1, #0x60]",
        "ldp d8, d9, [x1, #0x68]",
        "ldp d10, d11, [x1, #0x78]",
        "ldp d12, d13, [x1, #0x88]",
        "ldp d14, d15, [x1, #0x98]",
        "br x10",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_asm_offsets() {
        assert_eq!(std::mem::offset_of!(SavedRegs, sp), 0x00);
        assert_eq!(std::mem::offset_of!(SavedRegs, pc), 0x08);
        assert_eq!(std::mem::offset_of!(SavedRegs, x), 0x10);
        assert_eq!(std::mem::offset_of!(SavedRegs, d), 0x68);
        assert_eq!(std::mem::size_of::<SavedRegs>(), 0xA8);
    }

    #[test]
    fn test_init_context_aligns_stack() {
        let mut regs = SavedRegs::default();
        unsafe { init_context(&mut regs, 0x1000_000Fusize as *mut u8, 0x40, 3) };
        assert_eq!(regs.sp % 16, 0);
        assert_eq!(regs.x[0], 0x40);
        assert_eq!(regs.x[1], 3);
        assert_eq!(regs.x[10], 0);
    }
}
