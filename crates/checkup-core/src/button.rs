//! Debounced push button.
//!
//! The button is sampled by a periodic task; a level change is accepted only
//! after it has been seen on [`DEBOUNCE_SAMPLES`] consecutive scans. Besides
//! the raw edges the button reports a click (released within
//! [`CLICK_TIMEOUT`]) and a hold (kept down for [`HOLD_TIME`]). Events are
//! logged.

use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;
use heapless::Vec;
use log::{info, warn};

use crate::scheduler::{Task, TaskContext};

/// Consecutive scans a new level must hold before it is accepted.
pub const DEBOUNCE_SAMPLES: u8 = 2;

/// Longest press still reported as a click.
pub const CLICK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Press duration after which a hold is reported.
pub const HOLD_TIME: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Press,
    Release,
    Click,
    Hold,
}

/// Events produced by one scan; a release may complete a click.
pub type ButtonEvents = Vec<ButtonEvent, 2>;

/// Push button on an active-high input (pulled down when released).
pub struct Button<B> {
    pin: B,
    pressed: bool,
    counter: u8,
    pressed_at: Instant,
    held: bool,
}

impl<B: InputPin> Button<B> {
    pub fn new(pin: B) -> Self {
        Self {
            pin,
            pressed: false,
            counter: 0,
            pressed_at: Instant::from_ticks(0),
            held: false,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    fn held_for(&self, now: Instant) -> Duration {
        now.checked_duration_since(self.pressed_at)
            .unwrap_or(Duration::from_ticks(0))
    }

    /// Sample the pin once at `now`.
    pub fn poll(&mut self, now: Instant) -> ButtonEvents {
        let mut events = ButtonEvents::new();

        let level = match self.pin.is_high() {
            Ok(level) => level,
            Err(_) => {
                warn!("Button read failed");
                return events;
            }
        };

        if self.pressed && !self.held && self.held_for(now) >= HOLD_TIME {
            self.held = true;
            let _ = events.push(ButtonEvent::Hold);
        }

        if level == self.pressed {
            self.counter = 0;
            return events;
        }

        self.counter = self.counter.saturating_add(1);
        if self.counter < DEBOUNCE_SAMPLES {
            return events;
        }

        self.counter = 0;
        self.pressed = level;
        if level {
            self.pressed_at = now;
            self.held = false;
            let _ = events.push(ButtonEvent::Press);
        } else {
            let _ = events.push(ButtonEvent::Release);
            if !self.held && self.held_for(now) < CLICK_TIMEOUT {
                let _ = events.push(ButtonEvent::Click);
            }
        }
        events
    }
}

/// Scans a [`Button`] every `period` and logs its events.
pub struct ButtonTask<B> {
    button: Button<B>,
    period: Duration,
}

impl<B: InputPin> ButtonTask<B> {
    pub fn new(pin: B, period: Duration) -> Self {
        Self {
            button: Button::new(pin),
            period,
        }
    }
}

impl<B: InputPin, Ctx> Task<Ctx> for ButtonTask<B> {
    fn run(&mut self, _cx: &mut Ctx, sched: &mut TaskContext<'_>) {
        for event in self.button.poll(sched.dispatched_at()) {
            info!("Button event: {:?}", event);
        }
        sched.plan_current_relative(self.period);
    }

    fn name(&self) -> &'static str {
        "button"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    fn samples(levels: &[PinState]) -> PinMock {
        let transactions: alloc::vec::Vec<_> =
            levels.iter().map(|level| PinTransaction::get(*level)).collect();
        PinMock::new(&transactions)
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_press_and_release_are_debounced() {
        use PinState::{High, Low};
        let mut pin = samples(&[High, High, High, Low, Low]);
        let mut button = Button::new(pin.clone());

        assert!(button.poll(at(0)).is_empty());
        assert_eq!(button.poll(at(20)).as_slice(), [ButtonEvent::Press]);
        assert!(button.poll(at(40)).is_empty());
        assert!(button.is_pressed());
        assert!(button.poll(at(60)).is_empty());
        assert_eq!(
            button.poll(at(80)).as_slice(),
            [ButtonEvent::Release, ButtonEvent::Click]
        );

        pin.done();
    }

    #[test]
    fn test_single_sample_glitch_is_ignored() {
        use PinState::{High, Low};
        let mut pin = samples(&[High, Low, High, Low]);
        let mut button = Button::new(pin.clone());

        for ms in [0, 20, 40, 60] {
            assert!(button.poll(at(ms)).is_empty());
        }
        assert!(!button.is_pressed());

        pin.done();
    }

    #[test]
    fn test_long_press_holds_instead_of_clicking() {
        use PinState::{High, Low};
        let mut pin = samples(&[High, High, High, High, High, Low, Low]);
        let mut button = Button::new(pin.clone());

        assert!(button.poll(at(0)).is_empty());
        assert_eq!(button.poll(at(20)).as_slice(), [ButtonEvent::Press]);
        assert!(button.poll(at(2019)).is_empty());
        assert_eq!(button.poll(at(2020)).as_slice(), [ButtonEvent::Hold]);
        assert!(button.poll(at(3000)).is_empty());
        assert!(button.poll(at(3020)).is_empty());
        assert_eq!(button.poll(at(3040)).as_slice(), [ButtonEvent::Release]);

        pin.done();
    }

    #[test]
    fn test_slow_release_is_not_a_click() {
        use PinState::{High, Low};
        let mut pin = samples(&[High, High, Low, Low]);
        let mut button = Button::new(pin.clone());

        button.poll(at(0));
        assert_eq!(button.poll(at(20)).as_slice(), [ButtonEvent::Press]);
        assert!(button.poll(at(1480)).is_empty());
        assert_eq!(button.poll(at(1500)).as_slice(), [ButtonEvent::Release]);

        pin.done();
    }
}
