//! Task abstraction and the per-run planning context.

use embassy_time::{Duration, Instant};
use log::warn;

use super::Clock;

/// Stable handle of a registered task (its registration index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u8);

impl TaskId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u8)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A unit of cooperatively scheduled work.
///
/// `run` is called with the shared application context and must return
/// without blocking. Its earliest-run-time is set to dormant before the call,
/// so a task that wants to run again has to re-arm itself through `sched`
/// (or be re-armed externally).
pub trait Task<Ctx> {
    fn run(&mut self, cx: &mut Ctx, sched: &mut TaskContext<'_>);

    /// Name used in log output.
    fn name(&self) -> &'static str {
        "task"
    }
}

impl<Ctx, F> Task<Ctx> for F
where
    F: FnMut(&mut Ctx, &mut TaskContext<'_>),
{
    fn run(&mut self, cx: &mut Ctx, sched: &mut TaskContext<'_>) {
        self(cx, sched)
    }
}

/// Planning handle given to a running task.
///
/// Every "from now" operation samples the clock at the moment of the call.
pub struct TaskContext<'a> {
    current: TaskId,
    dispatched_at: Instant,
    clock: &'a dyn Clock,
    plans: &'a mut [Instant],
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        current: TaskId,
        dispatched_at: Instant,
        clock: &'a dyn Clock,
        plans: &'a mut [Instant],
    ) -> Self {
        Self {
            current,
            dispatched_at,
            clock,
            plans,
        }
    }

    /// Id of the task being run.
    pub fn current(&self) -> TaskId {
        self.current
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Instant at which the scheduler dispatched the current run.
    pub fn dispatched_at(&self) -> Instant {
        self.dispatched_at
    }

    /// Run the current task again as soon as the scheduler is idle.
    pub fn plan_current_now(&mut self) {
        self.plan_now(self.current);
    }

    pub fn plan_current_from_now(&mut self, delay: Duration) {
        self.plan_from_now(self.current, delay);
    }

    pub fn plan_current_absolute(&mut self, at: Instant) {
        self.plan_absolute(self.current, at);
    }

    /// Plan relative to the dispatch instant of this run rather than to now,
    /// so periodic tasks do not accumulate their own run time as drift.
    pub fn plan_current_relative(&mut self, delay: Duration) {
        let at = after(self.dispatched_at, delay);
        self.plan_absolute(self.current, at);
    }

    pub fn plan_now(&mut self, task: TaskId) {
        let now = self.clock.now();
        self.plan_absolute(task, now);
    }

    pub fn plan_from_now(&mut self, task: TaskId, delay: Duration) {
        let at = after(self.clock.now(), delay);
        self.plan_absolute(task, at);
    }

    pub fn plan_absolute(&mut self, task: TaskId, at: Instant) {
        match self.plans.get_mut(task.index()) {
            Some(slot) => *slot = at,
            None => warn!("Ignoring plan for unknown task {:?}", task),
        }
    }
}

/// `at + delay`, saturating at dormant.
pub(crate) fn after(at: Instant, delay: Duration) -> Instant {
    at.checked_add(delay).unwrap_or(Instant::MAX)
}
