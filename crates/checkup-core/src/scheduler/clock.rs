//! Monotonic time source for the scheduler.

use core::cell::Cell;

use embassy_time::{Duration, Instant};

/// Source of the monotonic "now" every plan decision is measured against.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock that only moves when told to.
///
/// Used by tests and by hosts that step time deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub const fn new() -> Self {
        Self {
            now: Cell::new(Instant::from_ticks(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, at: Instant) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}
