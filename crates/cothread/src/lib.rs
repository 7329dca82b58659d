//! # cothread - cooperative coroutines
//!
//! Many logical threads of control on one OS thread, each with its own
//! stack, switching only when they say so.
//!
//! ## Features
//!
//! - **Own stacks**: 1MB mmap'd stack per coroutine with a guard page
//! - **Fast switch**: callee-saved registers only, hand-written assembly
//!   for x86_64 and aarch64
//! - **Round-robin**: yielders rejoin the back of a FIFO ready queue
//! - **Nested resume**: a coroutine may resume another and gets control
//!   back when that one yields or finishes
//! - **Panics propagate**: a panicking coroutine dies and the panic
//!   continues out of the `run` that resumed it
//!
//! ## Quick Start
//!
//! ```ignore
//! use cothread::{create, run, yield_now, current_id};
//!
//! let id = create(|| {
//!     println!("begin {}", current_id());
//!     yield_now();
//!     println!("end {}", current_id());
//! });
//!
//! run(id); // prints "begin 1", returns at the yield
//! run(id); // prints "end 1", the coroutine is gone
//! ```
//!
//! ## Misuse
//!
//! Resuming an unknown or finished coroutine, and yielding from the main
//! context, are programming errors: the plain functions log and panic.
//! The `try_*` variants return [`SchedError`] instead.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │          create(), run(), yield_now(), current_id()         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Scheduler (one per OS thread)                  │
//! │      registry by id, FIFO ready queue, main context         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┴───────────────────┐
//!          ▼                                       ▼
//!    ┌────────────────────┐              ┌────────────────────┐
//!    │  ExecutionContext  │              │       Stack        │
//!    │  arch asm switch   │              │  mmap + guard page │
//!    └────────────────────┘              └────────────────────┘
//! ```

// Re-export core types
pub use cothread_core::{CoroutineId, CoroutineState, SchedError, SchedResult, MemoryError};

// Re-export kprint macros for debug logging
pub use cothread_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use cothread_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export runtime types
pub use cothread_runtime::{RuntimeConfig, ConfigError};

use cothread_runtime::scheduler;

#[cold]
#[track_caller]
fn fatal(err: SchedError) -> ! {
    kerror!("{}", err);
    panic!("cothread: {}", err)
}

/// Create a coroutine that will run `f` on its own stack.
///
/// The coroutine does not start until it is `run`. It joins the back of
/// the ready queue.
///
/// # Panics
///
/// If its stack cannot be allocated.
#[track_caller]
pub fn create<F>(f: F) -> CoroutineId
where
    F: FnOnce() + 'static,
{
    try_create(f).unwrap_or_else(|e| fatal(e))
}

pub fn try_create<F>(f: F) -> SchedResult<CoroutineId>
where
    F: FnOnce() + 'static,
{
    scheduler::create(f)
}

/// Start or resume `id`, returning when it yields or finishes.
///
/// A panic inside the coroutine continues unwinding from here.
///
/// # Panics
///
/// If `id` is unknown (never created or already finished), running, or
/// waiting on a coroutine it resumed itself.
#[track_caller]
pub fn run(id: CoroutineId) {
    try_run(id).unwrap_or_else(|e| fatal(e))
}

pub fn try_run(id: CoroutineId) -> SchedResult<()> {
    scheduler::resume(id)
}

/// Suspend the current coroutine and give control back to whoever ran it.
///
/// Execution continues right after this call on the next `run`.
///
/// # Panics
///
/// If called from the main context.
#[track_caller]
pub fn yield_now() {
    try_yield().unwrap_or_else(|e| fatal(e))
}

pub fn try_yield() -> SchedResult<()> {
    scheduler::yield_now()
}

/// Identity of the running coroutine, [`CoroutineId::MAIN`] outside one
#[inline]
pub fn current_id() -> CoroutineId {
    scheduler::current_id()
}

#[inline]
pub fn is_in_coroutine() -> bool {
    cothread_runtime::tls::is_in_coroutine()
}

/// Run the coroutine at the front of the ready queue.
///
/// `None` if nothing is ready.
pub fn run_next() -> Option<CoroutineId> {
    scheduler::run_next()
}

/// Round-robin until no coroutine is ready. Returns the number of runs.
pub fn run_all() -> usize {
    scheduler::run_all()
}

/// Coroutines created on this thread and not yet finished
pub fn live_count() -> usize {
    scheduler::live_count()
}

pub fn ready_count() -> usize {
    scheduler::ready_count()
}

pub fn state_of(id: CoroutineId) -> Option<CoroutineState> {
    scheduler::state_of(id)
}

/// Configure this thread's scheduler before creating any coroutine.
pub fn init(config: RuntimeConfig) -> SchedResult<()> {
    scheduler::init(config)
}

/// Discard every coroutine on this thread (main context only).
pub fn reset() -> SchedResult<()> {
    scheduler::reset()
}
