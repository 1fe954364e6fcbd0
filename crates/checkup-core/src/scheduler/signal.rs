//! Interrupt-safe plan requests.
//!
//! An interrupt handler (timer, GPIO edge, bus completion) must not touch the
//! scheduler directly. Instead it records "run this task at or before this
//! instant" in a [`PlanRequests`] set, which the scheduler absorbs at the
//! start of every pass. Recording is a short update inside a critical
//! section.
//!
//! Requests only ever move a task earlier: absorbing keeps the earlier of the
//! task's current earliest-run-time and the requested one.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time::{Duration, Instant};

use super::task::after;
use super::{Clock, MAX_TASKS, TaskId};

const NO_REQUEST: [Instant; MAX_TASKS] = [Instant::MAX; MAX_TASKS];

/// Pending plan requests: one "now" bit and one requested instant per task.
pub struct PlanRequests {
    pending: Mutex<Cell<u32>>,
    planned: Mutex<Cell<[Instant; MAX_TASKS]>>,
}

impl Default for PlanRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanRequests {
    /// Create an empty request set. `const` so it can live in a `static`.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(0)),
            planned: Mutex::new(Cell::new(NO_REQUEST)),
        }
    }

    /// Ask the scheduler to run `task` on its next pass.
    ///
    /// Callable from interrupt context.
    pub fn request_now(&self, task: TaskId) {
        let bit = 1u32 << task.index();
        critical_section::with(|cs| {
            let cell = self.pending.borrow(cs);
            cell.set(cell.get() | bit);
        });
    }

    /// Ask the scheduler to run `task` no later than `at`. Of several
    /// requests for the same task the earliest wins.
    ///
    /// Callable from interrupt context.
    pub fn request_at(&self, task: TaskId, at: Instant) {
        critical_section::with(|cs| {
            let cell = self.planned.borrow(cs);
            let mut planned = cell.get();
            if let Some(slot) = planned.get_mut(task.index()) {
                *slot = (*slot).min(at);
                cell.set(planned);
            }
        });
    }

    /// [`request_at`](Self::request_at) `delay` after `clock`'s now.
    pub fn request_from_now<C: Clock + ?Sized>(&self, clock: &C, task: TaskId, delay: Duration) {
        self.request_at(task, after(clock.now(), delay));
    }

    /// Take every pending request, leaving the set empty.
    pub(crate) fn take(&self) -> (u32, [Instant; MAX_TASKS]) {
        critical_section::with(|cs| {
            (
                self.pending.borrow(cs).replace(0),
                self.planned.borrow(cs).replace(NO_REQUEST),
            )
        })
    }

    pub fn is_pending(&self, task: TaskId) -> bool {
        let bit = 1u32 << task.index();
        critical_section::with(|cs| {
            self.pending.borrow(cs).get() & bit != 0
                || self
                    .planned
                    .borrow(cs)
                    .get()
                    .get(task.index())
                    .is_some_and(|at| *at != Instant::MAX)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualClock;

    #[test]
    fn test_earliest_timed_request_wins() {
        let requests = PlanRequests::new();
        let task = TaskId::new(3);

        requests.request_at(task, Instant::from_millis(80));
        requests.request_at(task, Instant::from_millis(50));
        requests.request_at(task, Instant::from_millis(90));

        let (now_bits, planned) = requests.take();
        assert_eq!(now_bits, 0);
        assert_eq!(planned[3], Instant::from_millis(50));
        assert!(!requests.is_pending(task));
    }

    #[test]
    fn test_request_from_now_reads_the_clock() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(10));
        let requests = PlanRequests::new();
        let task = TaskId::new(0);

        requests.request_from_now(&clock, task, Duration::from_millis(20));

        assert!(requests.is_pending(task));
        assert_eq!(requests.take().1[0], Instant::from_millis(30));
    }
}
