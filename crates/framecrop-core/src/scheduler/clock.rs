//! Time and refresh-tick sources for the frame scheduler.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// A monotonic time source.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// One-shot callback run on a display refresh.
pub type Tick = Box<dyn FnOnce()>;

/// The host's "run this once when you are ready to paint" primitive.
pub trait TickSource {
    fn request_tick(&self, tick: Tick);
}

/// Tick source driven by the host's render loop.
///
/// Requested ticks queue up until the host calls [`QueuedTicks::run_pending`],
/// typically once per redraw.
#[derive(Default)]
pub struct QueuedTicks {
    queue: RefCell<VecDeque<Tick>>,
}

impl QueuedTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the ticks queued before this call. Ticks requested while running
    /// wait for the next call. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let ticks: Vec<Tick> = self.queue.borrow_mut().drain(..).collect();
        let count = ticks.len();
        for tick in ticks {
            tick();
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl TickSource for QueuedTicks {
    fn request_tick(&self, tick: Tick) {
        self.queue.borrow_mut().push_back(tick);
    }
}

impl std::fmt::Debug for QueuedTicks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedTicks")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_millis(5));
        clock.advance(Duration::from_millis(7));
        assert_eq!(clock.now(), Duration::from_millis(12));
        clock.set(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_ticks_requested_while_running_wait() {
        let ticks = Rc::new(QueuedTicks::new());
        let ran = Rc::new(Cell::new(0));

        let inner_ticks = Rc::clone(&ticks);
        let inner_ran = Rc::clone(&ran);
        ticks.request_tick(Box::new(move || {
            inner_ran.set(inner_ran.get() + 1);
            let again = Rc::clone(&inner_ran);
            inner_ticks.request_tick(Box::new(move || again.set(again.get() + 1)));
        }));

        assert_eq!(ticks.run_pending(), 1);
        assert_eq!(ran.get(), 1);
        assert_eq!(ticks.pending(), 1);
        assert_eq!(ticks.run_pending(), 1);
        assert_eq!(ran.get(), 2);
        assert_eq!(ticks.run_pending(), 0);
    }
}
