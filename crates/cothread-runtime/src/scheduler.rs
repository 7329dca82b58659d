//! Coroutine scheduler
//!
//! One scheduler per OS thread, reached only through [`with_scheduler`].
//! It owns every live coroutine record, the FIFO ready queue, the identity
//! of the running coroutine and the saved main context.
//!
//! Every context transfer has three steps:
//! 1. bookkeeping under a scheduler borrow, producing a [`Transfer`]
//! 2. the borrow is released and the transfer executes
//! 3. whoever regains control re-borrows and finishes the bookkeeping
//!
//! No borrow of the scheduler is ever held across step 2, so the code on
//! the other side is free to call back into it.

use crate::config::RuntimeConfig;
use crate::context::ExecutionContext;
use crate::coroutine::{Coroutine, CoroutineFn, PanicPayload};
use crate::ready_queue::ReadyQueue;
use crate::tls;

use cothread_core::error::{SchedError, SchedResult};
use cothread_core::id::CoroutineId;
use cothread_core::state::CoroutineState;
use cothread_core::{kdebug, kerror, kwarn};

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

thread_local! {
    static SCHEDULER: RefCell<Option<Scheduler>> = const { RefCell::new(None) };
}

/// Run `f` against this thread's scheduler, creating it on first use.
///
/// # Panics
///
/// If called re-entrantly from inside `f`.
pub fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    SCHEDULER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let sched = slot.get_or_insert_with(|| Scheduler::new(RuntimeConfig::from_env()));
        f(sched)
    })
}

/// A pending switch from one saved context to another
#[derive(Clone, Copy)]
pub(crate) struct Transfer {
    from: *mut ExecutionContext,
    to: *const ExecutionContext,
}

impl Transfer {
    /// # Safety
    ///
    /// No scheduler borrow may be alive, and both contexts must outlive
    /// the switch (records are boxed and only reaped by their resumer).
    #[inline]
    unsafe fn execute(self) {
        ExecutionContext::transfer(self.from, self.to);
    }
}

pub struct Scheduler {
    config: RuntimeConfig,

    /// All live coroutines
    registry: HashMap<CoroutineId, Box<Coroutine>>,

    ready_queue: ReadyQueue,

    /// Coroutine holding the CPU (`MAIN` when none)
    running: CoroutineId,

    /// `None` once every identity up to `u32::MAX` has been handed out
    next_id: Option<CoroutineId>,

    /// Where the thread's own call stack is saved while coroutines run
    main_context: Box<ExecutionContext>,
}

impl Scheduler {
    /// Create a scheduler. An invalid configuration falls back to the
    /// compile-time defaults.
    pub fn new(config: RuntimeConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                kwarn!("{}, using defaults", e);
                RuntimeConfig::new()
            }
        };

        Self {
            registry: HashMap::with_capacity(config.registry_capacity),
            ready_queue: ReadyQueue::with_capacity(config.registry_capacity),
            running: CoroutineId::MAIN,
            next_id: Some(CoroutineId::FIRST),
            main_context: Box::new(ExecutionContext::empty()),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[inline]
    pub fn running(&self) -> CoroutineId {
        self.running
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn ready_count(&self) -> usize {
        self.ready_queue.len()
    }

    pub fn state_of(&self, id: CoroutineId) -> Option<CoroutineState> {
        self.registry.get(&id).map(|co| co.state())
    }

    /// Identities in scheduling order
    pub fn ready_ids(&self) -> Vec<CoroutineId> {
        self.ready_queue.iter().collect()
    }

    /// Register a new `Ready` coroutine at the back of the ready queue.
    pub fn create(&mut self, func: CoroutineFn) -> SchedResult<CoroutineId> {
        let id = self.next_id.ok_or(SchedError::IdsExhausted)?;

        let co = Coroutine::new(
            id,
            func,
            coroutine_entry,
            self.config.stack_size,
            self.config.guard_page,
        )?;
        self.next_id = id.next();

        if self.config.debug_logging {
            kdebug!("created coroutine {} ({:?})", id, co.stack());
        }

        self.registry.insert(co.id(), co);
        self.ready_queue.push(id);
        Ok(id)
    }

    /// Bookkeeping before transferring into `id`.
    fn begin_resume(&mut self, id: CoroutineId) -> SchedResult<Transfer> {
        let caller = self.running;

        let target = self
            .registry
            .get_mut(&id)
            .ok_or(SchedError::UnknownCoroutine(id))?;
        if target.awaiting().is_some() || !target.state().is_resumable() {
            return Err(SchedError::InvalidState { id, state: target.state() });
        }

        target.set_state(CoroutineState::Running);
        target.set_resumer(caller);
        let to = target.context_ptr() as *const ExecutionContext;
        self.ready_queue.remove(id);

        let from = if caller.is_main() {
            &mut *self.main_context as *mut ExecutionContext
        } else {
            // Caller stays suspended inside its own resume() until `id` comes back
            let current = self
                .registry
                .get_mut(&caller)
                .expect("running coroutine missing from registry");
            current.set_state(CoroutineState::HangUp);
            current.set_awaiting(Some(id));
            current.context_ptr()
        };

        if self.config.debug_logging {
            kdebug!("resuming coroutine {} from {}", id, caller);
        }

        self.switch_running(id);
        Ok(Transfer { from, to })
    }

    /// Hand the CPU back to the resumer of the running coroutine.
    ///
    /// `current` has already been moved to its new state.
    fn return_to_resumer(&mut self, current: CoroutineId) -> Transfer {
        let co = self
            .registry
            .get_mut(&current)
            .expect("running coroutine missing from registry");
        let resumer = co.resumer();
        let from = co.context_ptr();

        let to = if resumer.is_main() {
            &*self.main_context as *const ExecutionContext
        } else {
            let waiting = self
                .registry
                .get_mut(&resumer)
                .expect("resumer missing from registry");
            debug_assert_eq!(waiting.awaiting(), Some(current));
            waiting.set_awaiting(None);
            waiting.set_state(CoroutineState::Running);
            waiting.context_ptr() as *const ExecutionContext
        };

        self.switch_running(resumer);
        Transfer { from, to }
    }

    /// Bookkeeping before the running coroutine suspends.
    fn begin_yield(&mut self) -> SchedResult<Transfer> {
        let current = self.running;
        if current.is_main() {
            return Err(SchedError::YieldOutsideCoroutine);
        }

        if let Some(co) = self.registry.get_mut(&current) {
            let here = 0u8;
            debug_assert!(
                co.stack().contains(&here as *const u8 as usize),
                "coroutine {} yielding off its own stack",
                current
            );
            co.set_state(CoroutineState::HangUp);
        }
        self.ready_queue.push(current);

        if self.config.debug_logging {
            kdebug!("coroutine {} yields", current);
        }

        Ok(self.return_to_resumer(current))
    }

    /// Bookkeeping once the running coroutine's function has returned.
    fn begin_finish(&mut self, panic: Option<PanicPayload>) -> Transfer {
        let current = self.running;
        let co = self
            .registry
            .get_mut(&current)
            .expect("finishing coroutine missing from registry");
        co.set_state(CoroutineState::Dead);
        if let Some(payload) = panic {
            co.set_panic(payload);
        }

        if self.config.debug_logging {
            kdebug!("coroutine {} finished", current);
        }

        self.return_to_resumer(current)
    }

    /// Called by the resumer once control is back.
    ///
    /// A dead target leaves the registry here and is handed back to be
    /// dropped, stack included, on the resumer's stack.
    fn complete_resume(&mut self, id: CoroutineId) -> Option<Box<Coroutine>> {
        let dead = matches!(self.state_of(id), Some(CoroutineState::Dead));
        if !dead {
            return None;
        }
        self.ready_queue.remove(id);
        self.registry.remove(&id)
    }

    fn take_func(&mut self, id: CoroutineId) -> Option<CoroutineFn> {
        self.registry.get_mut(&id).and_then(|co| co.take_func())
    }

    fn switch_running(&mut self, id: CoroutineId) {
        self.running = id;
        tls::set_current_coroutine(id);
    }

    /// Replace the configuration. Only before any coroutine exists.
    pub fn reconfigure(&mut self, config: RuntimeConfig) -> SchedResult<()> {
        if !self.running.is_main() {
            return Err(SchedError::InCoroutine);
        }
        if !self.registry.is_empty() {
            return Err(SchedError::AlreadyInitialized);
        }
        config.validate()?;
        self.ready_queue = ReadyQueue::with_capacity(config.registry_capacity);
        self.config = config;
        Ok(())
    }

    /// Forget every coroutine and start identities from 1 again.
    ///
    /// The records are handed back so the caller can drop them outside
    /// the scheduler borrow.
    fn take_all(&mut self) -> SchedResult<Vec<Box<Coroutine>>> {
        if !self.running.is_main() {
            return Err(SchedError::InCoroutine);
        }
        self.ready_queue.clear();
        self.next_id = Some(CoroutineId::FIRST);
        Ok(self.registry.drain().map(|(_, co)| co).collect())
    }
}

/// Trampoline target: first Rust code on every coroutine stack.
extern "C" fn coroutine_entry(arg: usize) -> ! {
    let id = CoroutineId::new(arg as u32);

    if let Some(func) = with_scheduler(|s| s.take_func(id)) {
        // Unwinding must not cross the trampoline; the payload is re-raised
        // by whoever resumed us
        let outcome = panic::catch_unwind(AssertUnwindSafe(func));
        let transfer = with_scheduler(|s| s.begin_finish(outcome.err()));
        unsafe { transfer.execute() };
    } else {
        kerror!("coroutine {} entered without a function", id);
    }

    // A dead coroutine is never resumed
    std::process::abort()
}

/// Register a new coroutine; it runs on the first `resume`.
pub fn create<F>(f: F) -> SchedResult<CoroutineId>
where
    F: FnOnce() + 'static,
{
    with_scheduler(|s| s.create(Box::new(f)))
}

/// Transfer into `id` until it yields or finishes.
///
/// A panic raised by the coroutine's function resumes unwinding here.
pub fn resume(id: CoroutineId) -> SchedResult<()> {
    let transfer = with_scheduler(|s| s.begin_resume(id))?;
    unsafe { transfer.execute() };

    if let Some(mut dead) = with_scheduler(|s| s.complete_resume(id)) {
        let panic = dead.take_panic();
        drop(dead);
        if let Some(payload) = panic {
            panic::resume_unwind(payload);
        }
    }
    Ok(())
}

/// Suspend the running coroutine and return to its resumer.
pub fn yield_now() -> SchedResult<()> {
    let transfer = with_scheduler(|s| s.begin_yield())?;
    unsafe { transfer.execute() };
    Ok(())
}

/// Resume the coroutine at the front of the ready queue.
///
/// Returns `None` without doing anything when the queue is empty.
pub fn run_next() -> Option<CoroutineId> {
    let id = with_scheduler(|s| s.ready_queue.front())?;
    match resume(id) {
        Ok(()) => Some(id),
        Err(e) => {
            kerror!("run_next: {}", e);
            None
        }
    }
}

/// Drive the ready queue until it is empty. Returns the number of resumes.
///
/// Does not return while some coroutine keeps yielding forever.
pub fn run_all() -> usize {
    let mut resumed = 0;
    while run_next().is_some() {
        resumed += 1;
    }
    resumed
}

/// Identity of the running coroutine, `MAIN` outside any coroutine
#[inline]
pub fn current_id() -> CoroutineId {
    tls::current_coroutine_id()
}

pub fn live_count() -> usize {
    with_scheduler(|s| s.live_count())
}

pub fn ready_count() -> usize {
    with_scheduler(|s| s.ready_count())
}

pub fn state_of(id: CoroutineId) -> Option<CoroutineState> {
    with_scheduler(|s| s.state_of(id))
}

/// Apply `config` to this thread's scheduler. Must precede any `create`.
pub fn init(config: RuntimeConfig) -> SchedResult<()> {
    with_scheduler(|s| s.reconfigure(config))
}

/// Drop every coroutine on this thread and restart identities at 1.
///
/// Suspended coroutines are discarded with their stacks; values living in
/// their frames are leaked, not dropped.
pub fn reset() -> SchedResult<()> {
    let records = with_scheduler(|s| s.take_all())?;
    drop(records);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn small() {
        init(RuntimeConfig::new().stack_size(64 * 1024)).unwrap();
    }

    #[test]
    fn test_ids_strictly_increasing() {
        small();
        let ids: Vec<_> = (0..5).map(|_| create(|| {}).unwrap()).collect();
        assert_eq!(ids[0], CoroutineId::FIRST);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(live_count(), 5);
        assert_eq!(ready_count(), 5);
    }

    #[test]
    fn test_create_does_not_run() {
        small();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        let id = create(move || r.set(true)).unwrap();
        assert!(!ran.get());
        assert_eq!(state_of(id), Some(CoroutineState::Ready));
    }

    #[test]
    fn test_run_to_completion_then_unknown() {
        small();
        let ran = Rc::new(Cell::new(0));
        let r = ran.clone();
        let id = create(move || r.set(r.get() + 1)).unwrap();

        resume(id).unwrap();
        assert_eq!(ran.get(), 1);
        assert_eq!(live_count(), 0);
        assert_eq!(ready_count(), 0);
        assert_eq!(resume(id), Err(SchedError::UnknownCoroutine(id)));
    }

    #[test]
    fn test_yield_and_resume_keeps_locals() {
        small();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let id = create(move || {
            let mut counter = 10u64;
            for _ in 0..3 {
                s.borrow_mut().push(counter);
                counter += 1;
                yield_now().unwrap();
            }
        })
        .unwrap();

        for _ in 0..3 {
            resume(id).unwrap();
            assert_eq!(state_of(id), Some(CoroutineState::HangUp));
        }
        assert_eq!(*seen.borrow(), vec![10, 11, 12]);

        resume(id).unwrap();
        assert_eq!(state_of(id), None);
    }

    #[test]
    fn test_current_id_inside_and_outside() {
        small();
        assert_eq!(current_id(), CoroutineId::MAIN);
        let seen = Rc::new(Cell::new(CoroutineId::MAIN));
        let s = seen.clone();
        let id = create(move || s.set(current_id())).unwrap();
        resume(id).unwrap();
        assert_eq!(seen.get(), id);
        assert_eq!(current_id(), CoroutineId::MAIN);
    }

    #[test]
    fn test_yield_from_main_is_error() {
        small();
        assert_eq!(yield_now(), Err(SchedError::YieldOutsideCoroutine));
    }

    #[test]
    fn test_round_robin_fifo() {
        small();
        let order = Rc::new(RefCell::new(Vec::new()));
        let make = |tag: &'static str| {
            let o = order.clone();
            create(move || {
                o.borrow_mut().push(format!("{tag}0"));
                yield_now().unwrap();
                o.borrow_mut().push(format!("{tag}1"));
            })
            .unwrap()
        };
        let a = make("a");
        let b = make("b");

        resume(a).unwrap();
        resume(b).unwrap();
        assert_eq!(with_scheduler(|s| s.ready_ids()), vec![a, b]);

        assert_eq!(run_next(), Some(a));
        assert_eq!(run_next(), Some(b));
        assert_eq!(run_next(), None);
        assert_eq!(*order.borrow(), vec!["a0", "b0", "a1", "b1"]);
        assert_eq!(live_count(), 0);
    }

    #[test]
    fn test_explicit_resume_leaves_others_in_order() {
        small();
        let a = create(|| {}).unwrap();
        let b = create(|| {}).unwrap();
        let c = create(|| {}).unwrap();
        resume(b).unwrap();
        assert_eq!(with_scheduler(|s| s.ready_ids()), vec![a, c]);
    }

    #[test]
    fn test_run_all_drains_queue() {
        small();
        let total = Rc::new(Cell::new(0));
        for n in 0..4 {
            let t = total.clone();
            create(move || {
                for _ in 0..n {
                    t.set(t.get() + 1);
                    yield_now().unwrap();
                }
            })
            .unwrap();
        }
        // 4 first runs plus one extra resume per yield (0+1+2+3)
        assert_eq!(run_all(), 10);
        assert_eq!(total.get(), 6);
        assert_eq!(live_count(), 0);
    }

    #[test]
    fn test_nested_resume_returns_to_resumer() {
        small();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        let inner = create(move || {
            l.borrow_mut().push("inner start");
            yield_now().unwrap();
            l.borrow_mut().push("inner end");
        })
        .unwrap();

        let l = log.clone();
        let outer = create(move || {
            l.borrow_mut().push("outer start");
            resume(inner).unwrap();
            assert_eq!(current_id(), CoroutineId::new(2));
            l.borrow_mut().push("outer after inner yield");
            resume(inner).unwrap();
            l.borrow_mut().push("outer end");
        })
        .unwrap();
        assert_eq!(outer, CoroutineId::new(2));

        resume(outer).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["outer start", "inner start", "outer after inner yield", "inner end", "outer end"]
        );
        assert_eq!(live_count(), 0);
    }

    #[test]
    fn test_resume_of_waiting_coroutine_rejected() {
        small();
        let result = Rc::new(RefCell::new(None));
        let r = result.clone();
        let outer_id = CoroutineId::new(2);
        let inner = create(move || {
            *r.borrow_mut() = Some(resume(outer_id));
        })
        .unwrap();
        let outer = create(move || resume(inner).unwrap()).unwrap();
        assert_eq!(outer, outer_id);

        resume(outer).unwrap();
        assert!(matches!(
            *result.borrow(),
            Some(Err(SchedError::InvalidState { state: CoroutineState::HangUp, .. }))
        ));
    }

    #[test]
    fn test_resume_self_rejected() {
        small();
        let result = Rc::new(RefCell::new(None));
        let r = result.clone();
        let id = create(move || {
            *r.borrow_mut() = Some(resume(current_id()));
        })
        .unwrap();
        resume(id).unwrap();
        assert_eq!(
            *result.borrow(),
            Some(Err(SchedError::InvalidState { id, state: CoroutineState::Running }))
        );
    }

    #[test]
    fn test_panic_propagates_to_resumer() {
        small();
        let id = create(|| panic!("boom")).unwrap();
        let caught = panic::catch_unwind(|| resume(id));
        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
        assert_eq!(live_count(), 0);
        assert_eq!(current_id(), CoroutineId::MAIN);
    }

    #[test]
    fn test_deep_recursion_fits_stack() {
        init(RuntimeConfig::new().stack_size(256 * 1024)).unwrap();
        fn depth(n: u32) -> u32 {
            let pad = std::hint::black_box([0u8; 64]);
            if n == 0 {
                pad[0] as u32
            } else {
                1 + depth(n - 1) + pad[63] as u32
            }
        }
        let out = Rc::new(Cell::new(0));
        let o = out.clone();
        let id = create(move || o.set(depth(500))).unwrap();
        resume(id).unwrap();
        assert_eq!(out.get(), 500);
    }

    #[test]
    fn test_init_after_create_rejected() {
        small();
        create(|| {}).unwrap();
        assert_eq!(init(RuntimeConfig::new()), Err(SchedError::AlreadyInitialized));
        assert!(matches!(
            init(RuntimeConfig::new().stack_size(1)),
            Err(SchedError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        assert_eq!(
            init(RuntimeConfig::new().registry_capacity(0)),
            Err(SchedError::InvalidConfig("registry_capacity must be > 0"))
        );
    }

    #[test]
    fn test_reset_restarts_ids() {
        small();
        let a = create(|| {}).unwrap();
        let b = create(|| yield_now().unwrap()).unwrap();
        resume(b).unwrap();
        reset().unwrap();
        assert_eq!(live_count(), 0);
        assert_eq!(ready_count(), 0);
        assert_eq!(state_of(a), None);
        assert_eq!(create(|| {}).unwrap(), CoroutineId::FIRST);
    }

    #[test]
    fn test_reset_inside_coroutine_rejected() {
        small();
        let result = Rc::new(RefCell::new(None));
        let r = result.clone();
        let id = create(move || *r.borrow_mut() = Some(reset())).unwrap();
        resume(id).unwrap();
        assert_eq!(*result.borrow(), Some(Err(SchedError::InCoroutine)));
    }

    #[test]
    fn test_last_identity_is_handed_out_once() {
        small();
        with_scheduler(|s| s.next_id = Some(CoroutineId::new(u32::MAX)));
        assert_eq!(create(|| {}).unwrap(), CoroutineId::new(u32::MAX));
        assert_eq!(create(|| {}), Err(SchedError::IdsExhausted));
        assert_eq!(live_count(), 1);

        reset().unwrap();
        assert_eq!(create(|| {}).unwrap(), CoroutineId::FIRST);
    }

    #[test]
    fn test_lazy_scheduler_reads_environment() {
        // Only test touching COT_STACK_SIZE; each spawned thread builds its
        // scheduler from the environment on first use
        let stack_size_with = |value: &str| {
            std::env::set_var("COT_STACK_SIZE", value);
            let size = std::thread::spawn(|| with_scheduler(|s| s.config().stack_size))
                .join()
                .unwrap();
            std::env::remove_var("COT_STACK_SIZE");
            size
        };

        assert_eq!(stack_size_with("131072"), 131072);
        // Below the minimum: the whole config falls back to the defaults
        assert_eq!(stack_size_with("1024"), RuntimeConfig::new().stack_size);
    }

    #[test]
    fn test_schedulers_are_per_thread() {
        small();
        create(|| {}).unwrap();
        let other = std::thread::spawn(|| {
            init(RuntimeConfig::new().stack_size(64 * 1024)).unwrap();
            let id = create(|| {}).unwrap();
            resume(id).unwrap();
            (id, live_count())
        })
        .join()
        .unwrap();
        assert_eq!(other, (CoroutineId::FIRST, 0));
        assert_eq!(live_count(), 1);
    }
}
