//! Status LEDs
//!
//! Pulses are fire-and-forget: [`LedControl::pulse`] switches the LED on and
//! wakes the LED task through the interrupt-safe request path; the task then
//! calls [`LedControl::service`] to stamp the pulse end and switch it off
//! once it has passed.

use embassy_time::{Duration, Instant};
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::{Platform, Resources};
use crate::scheduler::{PlanRequests, Task, TaskContext, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLed {
    /// Core module LED, used for the boot indication.
    Board,
    /// LCD module LEDs, used for the health verdict.
    Green,
    Red,
}

pub trait LedControl {
    /// Switch `led` on for `duration`. Restarts a pulse already in progress.
    fn pulse(&mut self, led: StatusLed, duration: Duration);

    /// Switch off expired pulses. Returns when the next running pulse ends.
    fn service(&mut self, now: Instant) -> Option<Instant>;

    /// Task to wake whenever a pulse starts.
    fn bind_task(&mut self, _task: TaskId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pulse {
    Off,
    /// On, end not stamped yet.
    Starting(Duration),
    Until(Instant),
}

struct PulsedPin<P> {
    pin: P,
    pulse: Pulse,
}

impl<P: OutputPin> PulsedPin<P> {
    fn new(pin: P) -> Self {
        Self {
            pin,
            pulse: Pulse::Off,
        }
    }

    fn start(&mut self, led: StatusLed, duration: Duration) {
        if self.pin.set_high().is_err() {
            warn!("Failed to switch {:?} LED on", led);
        }
        self.pulse = Pulse::Starting(duration);
    }

    fn service(&mut self, led: StatusLed, now: Instant) -> Option<Instant> {
        match self.pulse {
            Pulse::Off => None,
            Pulse::Starting(duration) => {
                let end = now.checked_add(duration).unwrap_or(Instant::MAX);
                self.pulse = Pulse::Until(end);
                Some(end)
            }
            Pulse::Until(end) if end <= now => {
                if self.pin.set_low().is_err() {
                    warn!("Failed to switch {:?} LED off", led);
                }
                self.pulse = Pulse::Off;
                None
            }
            Pulse::Until(end) => Some(end),
        }
    }
}

/// Board, green and red status LEDs on GPIO outputs, active high.
pub struct GpioStatusLeds<'a, L, G, R> {
    board: PulsedPin<L>,
    green: PulsedPin<G>,
    red: PulsedPin<R>,
    requests: &'a PlanRequests,
    task: Option<TaskId>,
}

impl<'a, L: OutputPin, G: OutputPin, R: OutputPin> GpioStatusLeds<'a, L, G, R> {
    pub fn new(board: L, green: G, red: R, requests: &'a PlanRequests) -> Self {
        Self {
            board: PulsedPin::new(board),
            green: PulsedPin::new(green),
            red: PulsedPin::new(red),
            requests,
            task: None,
        }
    }

    pub fn is_on(&self, led: StatusLed) -> bool {
        let pulse = match led {
            StatusLed::Board => self.board.pulse,
            StatusLed::Green => self.green.pulse,
            StatusLed::Red => self.red.pulse,
        };
        pulse != Pulse::Off
    }
}

impl<L: OutputPin, G: OutputPin, R: OutputPin> LedControl for GpioStatusLeds<'_, L, G, R> {
    fn pulse(&mut self, led: StatusLed, duration: Duration) {
        match led {
            StatusLed::Board => self.board.start(led, duration),
            StatusLed::Green => self.green.start(led, duration),
            StatusLed::Red => self.red.start(led, duration),
        }

        match self.task {
            Some(task) => self.requests.request_now(task),
            None => warn!("LED pulse with no service task bound"),
        }
    }

    fn service(&mut self, now: Instant) -> Option<Instant> {
        let board = self.board.service(StatusLed::Board, now);
        let green = self.green.service(StatusLed::Green, now);
        let red = self.red.service(StatusLed::Red, now);
        [board, green, red].into_iter().flatten().min()
    }

    fn bind_task(&mut self, task: TaskId) {
        self.task = Some(task);
    }
}

/// Services the status LEDs: dormant until a pulse wakes it, then re-armed
/// for the end of the earliest running pulse.
pub struct LedTask;

impl<P: Platform> Task<Resources<P>> for LedTask {
    fn run(&mut self, cx: &mut Resources<P>, sched: &mut TaskContext<'_>) {
        if let Some(end) = cx.leds.service(sched.now()) {
            sched.plan_current_absolute(end);
        }
    }

    fn name(&self) -> &'static str {
        "leds"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    fn pulse_pin() -> PinMock {
        PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ])
    }

    #[test]
    fn test_pulse_switches_off_after_duration() {
        let requests = PlanRequests::new();
        let mut board = PinMock::new(&[]);
        let mut green = pulse_pin();
        let mut red = PinMock::new(&[]);
        let mut leds = GpioStatusLeds::new(board.clone(), green.clone(), red.clone(), &requests);

        leds.pulse(StatusLed::Green, Duration::from_millis(100));
        assert!(leds.is_on(StatusLed::Green));

        let start = Instant::from_millis(40);
        assert_eq!(leds.service(start), Some(Instant::from_millis(140)));
        assert_eq!(leds.service(Instant::from_millis(139)), Some(Instant::from_millis(140)));
        assert_eq!(leds.service(Instant::from_millis(140)), None);
        assert!(!leds.is_on(StatusLed::Green));

        board.done();
        green.done();
        red.done();
    }

    #[test]
    fn test_pulse_wakes_bound_task() {
        let requests = PlanRequests::new();
        let mut board = PinMock::new(&[]);
        let mut green = PinMock::new(&[]);
        let mut red = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let mut leds = GpioStatusLeds::new(board.clone(), green.clone(), red.clone(), &requests);
        let task = TaskId::new(3);

        leds.bind_task(task);
        leds.pulse(StatusLed::Red, Duration::from_millis(100));

        assert!(requests.is_pending(task));
        board.done();
        green.done();
        red.done();
    }

    #[test]
    fn test_service_reports_earliest_pulse_end() {
        let requests = PlanRequests::new();
        let mut board = PinMock::new(&[]);
        let mut green = pulse_pin();
        let mut red = pulse_pin();
        let mut leds = GpioStatusLeds::new(board.clone(), green.clone(), red.clone(), &requests);

        leds.pulse(StatusLed::Green, Duration::from_millis(300));
        leds.pulse(StatusLed::Red, Duration::from_millis(100));

        assert_eq!(leds.service(Instant::from_millis(0)), Some(Instant::from_millis(100)));
        assert_eq!(leds.service(Instant::from_millis(100)), Some(Instant::from_millis(300)));
        assert_eq!(leds.service(Instant::from_millis(300)), None);

        board.done();
        green.done();
        red.done();
    }

    #[test]
    fn test_boot_pulse_runs_alongside_verdict_pulse() {
        let requests = PlanRequests::new();
        let mut board = pulse_pin();
        let mut green = pulse_pin();
        let mut red = PinMock::new(&[]);
        let mut leds = GpioStatusLeds::new(board.clone(), green.clone(), red.clone(), &requests);

        leds.pulse(StatusLed::Board, Duration::from_millis(2000));
        leds.pulse(StatusLed::Green, Duration::from_millis(100));

        assert_eq!(leds.service(Instant::from_millis(0)), Some(Instant::from_millis(100)));
        assert_eq!(leds.service(Instant::from_millis(100)), Some(Instant::from_millis(2000)));
        assert!(leds.is_on(StatusLed::Board));
        assert_eq!(leds.service(Instant::from_millis(2000)), None);
        assert!(!leds.is_on(StatusLed::Board));

        board.done();
        green.done();
        red.done();
    }
}
