//! Frame-budgeted update scheduling.
//!
//! High-frequency work (drag handlers, resize, frame capture) submits
//! [`FrameCallback`]s instead of running directly. Each distinct callback runs
//! at most once per refresh budget; repeated submissions before the next flush
//! collapse into one run.
//!
//! The only timing inputs are an injected [`Clock`] and [`TickSource`]. State
//! lives in one [`FrameScheduler`] per process and is single-threaded.
//!
//! # Flush rules
//!
//! 1. A callback already pending is not queued again.
//! 2. The pending set is swapped out before any callback runs, so a callback
//!    that schedules itself lands in the next flush.
//! 3. Time debt carried between flushes is capped at
//!    [`SchedulerConfig::max_debt`], so an idle period never turns into a burst
//!    of catch-up flushes.
//! 4. A panicking callback is logged; the rest of the flush still runs.

mod clock;
mod config;

pub use clock::{Clock, ManualClock, QueuedTicks, SystemClock, Tick, TickSource};
pub use config::{
    DEFAULT_MAX_DEBT_FRAMES, DEFAULT_TARGET_FPS, SCHEDULER_MODE_ENV, SchedulerConfig,
    SchedulerMode, TARGET_FPS_ENV,
};

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Duration;

/// A zero-argument callback with a stable identity.
///
/// Clones share the identity, so scheduling any clone coalesces with the others.
#[derive(Clone)]
pub struct FrameCallback {
    id: u64,
    run: Rc<dyn Fn()>,
}

impl FrameCallback {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for FrameCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCallback").field("id", &self.id).finish()
    }
}

struct State {
    config: SchedulerConfig,
    clock: Rc<dyn Clock>,
    ticks: Rc<dyn TickSource>,
    pending: Vec<FrameCallback>,
    /// A tick is outstanding with the tick source.
    frame_requested: bool,
    /// `None` until the first flush.
    last_flush: Option<Duration>,
    debt: Duration,
    next_id: u64,
}

impl State {
    fn elapsed(&self, now: Duration) -> Duration {
        match self.last_flush {
            Some(last) => now.saturating_sub(last),
            // The first flush runs on the first tick.
            None => self.config.frame_budget() + Duration::from_millis(1),
        }
    }
}

/// Coalesces callbacks onto display refresh ticks.
#[derive(Clone)]
pub struct FrameScheduler {
    state: Rc<RefCell<State>>,
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig, clock: Rc<dyn Clock>, ticks: Rc<dyn TickSource>) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                config,
                clock,
                ticks,
                pending: Vec::new(),
                frame_requested: false,
                last_flush: None,
                debt: Duration::ZERO,
                next_id: 0,
            })),
        }
    }

    /// A scheduler that runs every callback as soon as it is scheduled.
    pub fn immediate() -> Self {
        Self::new(
            SchedulerConfig::immediate(),
            Rc::new(SystemClock::new()),
            Rc::new(QueuedTicks::new()),
        )
    }

    pub fn config(&self) -> SchedulerConfig {
        self.state.borrow().config
    }

    /// Register a callback identity.
    pub fn callback(&self, f: impl Fn() + 'static) -> FrameCallback {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        FrameCallback { id, run: Rc::new(f) }
    }

    /// Wrap `f` so each call schedules it, coalesced per frame.
    ///
    /// The wrapper does not keep the scheduler alive; once every
    /// [`FrameScheduler`] handle is dropped, calls are ignored.
    pub fn throttle(&self, f: impl Fn() + 'static) -> Throttled {
        Throttled {
            callback: self.callback(f),
            scheduler: Rc::downgrade(&self.state),
        }
    }

    /// Schedule a callback that may be re-submitted continuously (drag, resize).
    pub fn schedule_coalesced(&self, callback: &FrameCallback) {
        self.enqueue(callback);
    }

    /// Schedule a one-shot callback for the next available tick.
    ///
    /// Dedup and flush behave exactly as in [`Self::schedule_coalesced`].
    pub fn schedule_next_tick(&self, callback: &FrameCallback) {
        self.enqueue(callback);
    }

    pub fn pending_len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// True when nothing is pending and no tick is outstanding.
    pub fn is_idle(&self) -> bool {
        let state = self.state.borrow();
        state.pending.is_empty() && !state.frame_requested
    }

    /// Time debt carried into the next flush.
    pub fn debt(&self) -> Duration {
        self.state.borrow().debt
    }

    fn enqueue(&self, callback: &FrameCallback) {
        {
            let mut state = self.state.borrow_mut();
            if state.config.mode == SchedulerMode::Immediate {
                drop(state);
                invoke(callback);
                return;
            }
            if state.pending.iter().any(|p| p.id == callback.id) {
                return;
            }
            state.pending.push(callback.clone());
        }
        request_frame(&self.state);
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FrameScheduler")
            .field("config", &state.config)
            .field("pending", &state.pending.len())
            .field("frame_requested", &state.frame_requested)
            .field("debt", &state.debt)
            .finish()
    }
}

/// Ask the tick source for a tick, unless one is outstanding or nothing is pending.
///
/// Below one frame budget of accumulated time the tick only re-checks; once a
/// budget has accrued it flushes.
fn request_frame(shared: &Rc<RefCell<State>>) {
    let (ticks, tick) = {
        let mut state = shared.borrow_mut();
        if state.frame_requested || state.pending.is_empty() {
            return;
        }
        let now = state.clock.now();
        let elapsed = state.elapsed(now);
        let budget = state.config.frame_budget();
        state.frame_requested = true;

        let weak = Rc::downgrade(shared);
        let tick: Tick = if state.debt.saturating_add(elapsed) < budget {
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.borrow_mut().frame_requested = false;
                    request_frame(&shared);
                }
            })
        } else {
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    flush(&shared, now, elapsed);
                }
            })
        };
        (Rc::clone(&state.ticks), tick)
    };
    ticks.request_tick(tick);
}

fn flush(shared: &Rc<RefCell<State>>, now: Duration, elapsed: Duration) {
    let batch = {
        let mut state = shared.borrow_mut();
        state.frame_requested = false;
        state.last_flush = Some(now);
        let budget = state.config.frame_budget();
        let max_debt = state.config.max_debt();
        state.debt = state
            .debt
            .saturating_add(elapsed)
            .saturating_sub(budget)
            .min(max_debt);
        std::mem::take(&mut state.pending)
    };

    log::trace!("Flushing {} frame callbacks", batch.len());
    for callback in &batch {
        invoke(callback);
    }
}

fn invoke(callback: &FrameCallback) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (callback.run)())) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("Frame callback {} panicked: {}", callback.id, message);
    }
}

/// A function whose calls are throttled to one run per frame.
#[derive(Clone, Debug)]
pub struct Throttled {
    scheduler: Weak<RefCell<State>>,
    callback: FrameCallback,
}

impl Throttled {
    pub fn call(&self) {
        if let Some(state) = self.scheduler.upgrade() {
            FrameScheduler { state }.schedule_coalesced(&self.callback);
        }
    }

    pub fn callback(&self) -> &FrameCallback {
        &self.callback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const MS: Duration = Duration::from_millis(1);

    struct Harness {
        clock: Rc<ManualClock>,
        ticks: Rc<QueuedTicks>,
        scheduler: FrameScheduler,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(SchedulerConfig::default())
        }

        fn with_config(config: SchedulerConfig) -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            let clock = Rc::new(ManualClock::new());
            let ticks = Rc::new(QueuedTicks::new());
            let scheduler = FrameScheduler::new(config, clock.clone(), ticks.clone());
            Self {
                clock,
                ticks,
                scheduler,
            }
        }

        /// Advance the clock by `step` and deliver one refresh.
        fn frame(&self, step: Duration) {
            self.clock.advance(step);
            self.ticks.run_pending();
        }

        fn counter(&self) -> (FrameCallback, Rc<Cell<u32>>) {
            let count = Rc::new(Cell::new(0));
            let inner = Rc::clone(&count);
            let callback = self.scheduler.callback(move || inner.set(inner.get() + 1));
            (callback, count)
        }
    }

    #[test]
    fn test_first_submission_runs_on_first_tick() {
        let h = Harness::new();
        let (callback, count) = h.counter();
        h.scheduler.schedule_coalesced(&callback);
        assert_eq!(count.get(), 0);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 1);
        assert!(h.scheduler.is_idle());
    }

    #[test]
    fn test_repeated_submissions_coalesce() {
        let h = Harness::new();
        let (callback, count) = h.counter();
        for _ in 0..25 {
            h.scheduler.schedule_coalesced(&callback);
            h.scheduler.schedule_next_tick(&callback.clone());
        }
        assert_eq!(h.scheduler.pending_len(), 1);
        for _ in 0..5 {
            h.frame(17 * MS);
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_distinct_callbacks_share_one_flush() {
        let h = Harness::new();
        let (a, a_count) = h.counter();
        let (b, b_count) = h.counter();
        h.scheduler.schedule_coalesced(&a);
        h.scheduler.schedule_next_tick(&b);
        assert_eq!(h.scheduler.pending_len(), 2);
        h.frame(Duration::ZERO);
        assert_eq!((a_count.get(), b_count.get()), (1, 1));
    }

    #[test]
    fn test_waits_for_a_full_budget() {
        let h = Harness::new();
        let (callback, count) = h.counter();
        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 1);

        // 4ms later: still inside the budget window.
        h.clock.advance(4 * MS);
        for _ in 0..10 {
            h.scheduler.schedule_coalesced(&callback);
        }
        h.frame(4 * MS);
        h.frame(4 * MS);
        h.frame(4 * MS);
        assert_eq!(count.get(), 1);
        assert_eq!(h.scheduler.pending_len(), 1);

        // Past one budget since the last flush: the next tick flushes.
        h.frame(5 * MS);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 2);
        assert!(h.scheduler.is_idle());
    }

    #[test]
    fn test_debt_is_capped_after_idle_gap() {
        let h = Harness::new();
        let (callback, count) = h.counter();
        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);

        h.clock.advance(Duration::from_secs(600));
        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 2);
        let config = h.scheduler.config();
        assert!(h.scheduler.debt() <= config.max_debt());
        assert!(h.scheduler.debt() > Duration::ZERO);

        // The cap bounds how many back-to-back flushes the gap can buy.
        let mut flushes = 0;
        for _ in 0..40 {
            h.scheduler.schedule_coalesced(&callback);
            let before = count.get();
            h.frame(MS);
            flushes += count.get() - before;
            if count.get() == before {
                break;
            }
        }
        assert!(flushes <= DEFAULT_MAX_DEBT_FRAMES as u32 + 1, "{flushes} flushes");
    }

    #[test]
    fn test_debt_multiplier_is_tunable() {
        let h = Harness::with_config(SchedulerConfig::default().with_max_debt_frames(0.0));
        let (callback, _) = h.counter();
        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);
        h.clock.advance(Duration::from_secs(5));
        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);
        assert_eq!(h.scheduler.debt(), Duration::ZERO);
    }

    #[test]
    fn test_self_rescheduling_lands_in_next_flush() {
        let h = Harness::new();
        let count = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));

        let scheduler = h.scheduler.clone();
        let inner_count = Rc::clone(&count);
        let inner_slot = Rc::clone(&slot);
        let callback = h.scheduler.callback(move || {
            inner_count.set(inner_count.get() + 1);
            if let Some(me) = inner_slot.borrow().as_ref() {
                scheduler.schedule_coalesced(me);
            }
        });
        *slot.borrow_mut() = Some(callback.clone());

        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 1);
        assert_eq!(h.scheduler.pending_len(), 1);

        h.frame(20 * MS);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 2);

        // Break the cycle.
        slot.borrow_mut().take();
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let h = Harness::new();
        let boom = h.scheduler.callback(|| panic!("boom"));
        let (callback, count) = h.counter();
        h.scheduler.schedule_coalesced(&boom);
        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 1);

        // The scheduler keeps working afterwards.
        h.scheduler.schedule_coalesced(&callback);
        h.frame(20 * MS);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_immediate_mode_runs_synchronously() {
        let scheduler = FrameScheduler::immediate();
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        let throttled = scheduler.throttle(move || inner.set(inner.get() + 1));
        throttled.call();
        assert_eq!(count.get(), 1);
        throttled.call();
        scheduler.schedule_next_tick(throttled.callback());
        assert_eq!(count.get(), 3);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_throttled_call_coalesces() {
        let h = Harness::new();
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        let throttled = h.scheduler.throttle(move || inner.set(inner.get() + 1));
        throttled.call();
        throttled.clone().call();
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_huge_debt_cap_does_not_fault_the_tick() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "max_debt_frames": 1e300 }"#).unwrap();
        let h = Harness::with_config(config);
        let (callback, count) = h.counter();
        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 1);

        h.clock.advance(Duration::from_secs(600));
        h.scheduler.schedule_coalesced(&callback);
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 2);
        assert!(h.scheduler.debt() > Duration::from_secs(599));
    }

    #[test]
    fn test_self_calling_throttle_does_not_leak_scheduler() {
        let h = Harness::new();
        let count = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Throttled>>> = Rc::new(RefCell::new(None));

        let inner_count = Rc::clone(&count);
        let inner_slot = Rc::clone(&slot);
        let throttled = h.scheduler.throttle(move || {
            inner_count.set(inner_count.get() + 1);
            if let Some(me) = inner_slot.borrow().as_ref() {
                me.call();
            }
        });
        *slot.borrow_mut() = Some(throttled.clone());

        throttled.call();
        h.frame(Duration::ZERO);
        assert_eq!(count.get(), 1);
        assert_eq!(h.scheduler.pending_len(), 1);

        let state = Rc::downgrade(&h.scheduler.state);
        let Harness { clock: _, ticks, scheduler } = h;
        drop(scheduler);
        assert!(state.upgrade().is_none());

        throttled.call();
        ticks.run_pending();
        assert_eq!(count.get(), 1);
        slot.borrow_mut().take();
    }

    #[test]
    fn test_dropped_scheduler_ignores_ticks() {
        let h = Harness::new();
        let (callback, count) = h.counter();
        h.scheduler.schedule_coalesced(&callback);
        let Harness { clock: _, ticks, scheduler } = h;
        drop(scheduler);
        drop(callback);
        ticks.run_pending();
        assert_eq!(count.get(), 0);
    }
}
