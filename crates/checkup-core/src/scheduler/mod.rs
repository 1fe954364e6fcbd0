//! Cooperative run-to-completion scheduler.
//!
//! Every registered task has an earliest-run-time. A pass picks the task with
//! the smallest earliest-run-time that is already due (ties go to the task
//! registered first), marks it dormant, and runs it to completion. The task
//! re-arms itself through its [`TaskContext`]; waiting is always expressed as
//! a later earliest-run-time, never as a blocking call.
//!
//! ```rust,ignore
//! static REQUESTS: PlanRequests = PlanRequests::new();
//!
//! let mut scheduler = Scheduler::new(board_clock, &REQUESTS);
//! scheduler.register(Box::new(blink), Duration::from_ticks(0))?;
//! scheduler.run(&mut resources, |next_due| board.wait_for_interrupt(next_due))
//! ```

mod clock;
mod signal;
mod task;

pub use clock::{Clock, ManualClock};
pub use signal::PlanRequests;
pub use task::{Task, TaskContext, TaskId};

use alloc::boxed::Box;
use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::{trace, warn};
use thiserror_no_std::Error;

use task::after;

/// Maximum number of tasks (bounded by the width of the plan-request mask).
pub const MAX_TASKS: usize = 16;

/// Errors raised while wiring tasks at boot.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Task capacity exceeded (max: {max})")]
    CapacityExceeded { max: usize },
}

/// Outcome of a single scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The given task body ran to completion.
    Ran(TaskId),
    /// Nothing was due. `next_due` is the earliest armed task, if any.
    Idle { next_due: Option<Instant> },
}

pub struct Scheduler<'a, Ctx, C: Clock> {
    tasks: Vec<Box<dyn Task<Ctx>>, MAX_TASKS>,
    plans: Vec<Instant, MAX_TASKS>,
    clock: C,
    requests: &'a PlanRequests,
}

impl<'a, Ctx, C: Clock> Scheduler<'a, Ctx, C> {
    pub fn new(clock: C, requests: &'a PlanRequests) -> Self {
        Self {
            tasks: Vec::new(),
            plans: Vec::new(),
            clock,
            requests,
        }
    }

    /// Add a task whose first run is `first_run` after now.
    pub fn register(
        &mut self,
        task: Box<dyn Task<Ctx>>,
        first_run: Duration,
    ) -> Result<TaskId, SchedulerError> {
        let id = TaskId::new(self.tasks.len());
        let at = after(self.clock.now(), first_run);

        self.tasks
            .push(task)
            .map_err(|_| SchedulerError::CapacityExceeded { max: MAX_TASKS })?;
        if self.plans.push(at).is_err() {
            self.tasks.pop();
            return Err(SchedulerError::CapacityExceeded { max: MAX_TASKS });
        }

        trace!("Registered {} as {:?}", self.tasks[id.index()].name(), id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clock(&self) -> &C {
        &self.clock
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

    /// Earliest-run-time of `task`; `None` when dormant or unknown.
    pub fn planned_at(&self, task: TaskId) -> Option<Instant> {
        self.plans
            .get(task.index())
            .copied()
            .filter(|at| *at != Instant::MAX)
    }

    /// Run at most one due task.
    pub fn run_once(&mut self, cx: &mut Ctx) -> Step {
        self.absorb_requests();

        let now = self.clock.now();
        let Some(index) = self.next_due(now) else {
            return Step::Idle {
                next_due: self.plans.iter().copied().filter(|at| *at != Instant::MAX).min(),
            };
        };

        let Self {
            tasks,
            plans,
            clock,
            ..
        } = self;

        let id = TaskId::new(index);
        plans[index] = Instant::MAX;

        let task = &mut tasks[index];
        trace!("Running {} ({:?})", task.name(), id);

        let mut sched = TaskContext::new(id, now, &*clock, plans.as_mut_slice());
        task.run(cx, &mut sched);

        Step::Ran(id)
    }

    /// Run forever. `idle` is called whenever nothing is due, with the next
    /// due instant, and may put the processor into a low-power wait until
    /// then or until an interrupt arrives.
    pub fn run(&mut self, cx: &mut Ctx, mut idle: impl FnMut(Option<Instant>)) -> ! {
        loop {
            if let Step::Idle { next_due } = self.run_once(cx) {
                idle(next_due);
            }
        }
    }

    fn absorb_requests(&mut self) {
        let (mut pending, planned) = self.requests.take();

        if pending != 0 {
            let now = self.clock.now();
            while pending != 0 {
                let index = pending.trailing_zeros() as usize;
                pending &= pending - 1;
                self.absorb(index, now);
            }
        }

        for (index, at) in planned.into_iter().enumerate() {
            if at != Instant::MAX {
                self.absorb(index, at);
            }
        }
    }

    // Never push a task that is already due further away.
    fn absorb(&mut self, index: usize, at: Instant) {
        match self.plans.get_mut(index) {
            Some(slot) => *slot = (*slot).min(at),
            None => warn!("Dropping plan request for unknown task {}", index),
        }
    }

    /// Index of the earliest due task; strict `<` keeps registration order
    /// on ties.
    fn next_due(&self, now: Instant) -> Option<usize> {
        let mut best: Option<(usize, Instant)> = None;
        for (index, at) in self.plans.iter().copied().enumerate() {
            if at > now {
                continue;
            }
            match best {
                Some((_, best_at)) if best_at <= at => {}
                _ => best = Some((index, at)),
            }
        }
        best.map(|(index, _)| index)
    }
}
