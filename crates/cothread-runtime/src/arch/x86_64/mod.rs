//! x86_64 context switching (System V AMD64 ABI)

use cothread_core::constants::STACK_ALIGN;
use std::arch::naked_asm;

/// Registers preserved across a voluntary switch
///
/// Layout is fixed, the assembly below addresses fields by offset:
/// ```text
/// 0x00 rsp   0x08 rip   0x10 rbx   0x18 rbp
/// 0x20 r12   0x28 r13   0x30 r14   0x38 r15
/// 0x40 mxcsr (u32)      0x44 x87 control word (u16)
/// ```
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SavedRegs {
    pub rsp: u64,
    pub rip: u64,
    pub rbx: u64,
    pub rbp: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub mxcsr: u32,
    pub fpucw: u16,
    _pad: u16,
}

/// Default MXCSR: all exceptions masked, round to nearest
const MXCSR_DEFAULT: u32 = 0x1F80;

/// Default x87 control word: all exceptions masked, 64-bit precision
const FPUCW_DEFAULT: u16 = 0x037F;

/// Prepare `regs` so that switching to it runs `entry_fn(entry_arg)` on
/// the stack ending at `stack_top`.
///
/// `entry_fn` must be an `extern "C" fn(usize) -> !`.
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
    // rsp is 16-byte aligned when the trampoline starts, so its `call`
    // leaves the entry function with the ABI's rsp % 16 == 8 on entry
    let sp = stack_top as usize & !(STACK_ALIGN - 1);

    *regs = SavedRegs {
        rsp: sp as u64,
        rip: coroutine_trampoline as usize as u64,
        r12: entry_fn as u64,
        r13: entry_arg as u64,
        mxcsr: MXCSR_DEFAULT,
        fpucw: FPUCW_DEFAULT,
        ..SavedRegs::default()
    };
}

/// First code a fresh coroutine runs: `r12(r13)`, never returns
#[unsafe(naked)]
unsafe extern "C" fn coroutine_trampoline() {
    naked_asm!(
        "mov rdi, r13",
        "call r12",
        "ud2",
    );
}

/// Save callee-saved state into `old`, load it from `new` and continue
/// wherever `new` was saved.
///
/// Returns when something switches back to `old`.
///
/// # Safety
///
/// `new` must hold registers produced by `init_context` or by an earlier
/// `context_switch`, and its stack must still be mapped.
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(_old: *mut SavedRegs, _new: *const SavedRegs) {
    naked_asm!(
        // Save into old (rdi). rsp points at our return address.
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        "stmxcsr [rdi + 0x40]",
        "fnstcw [rdi + 0x44]",
        // Load from new (rsi)
        "mov rsp, [rsi + 0x00]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "ldmxcsr [rsi + 0x40]",
        "fldcw [rsi + 0x44]",
        "jmp qword ptr [rsi + 0x08]",
        // Resume point of a saved context
        "2:",
        "ret",
    );
}
