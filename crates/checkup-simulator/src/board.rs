//! Simulated board peripherals: clock, LCD panel, LED and button pins.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::{Duration as StdDuration, Instant as StdInstant};

use checkup_core::Platform;
use checkup_core::display::{HEIGHT, LcdSink, Panel, WIDTH};
use checkup_core::led::GpioStatusLeds;
use checkup_core::power::FixedClock;
use checkup_core::scheduler::Clock;
use embassy_time::Instant;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics_simulator::SimulatorDisplay;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::debug;

use crate::devices::SimBus;

/// Height of the status strip drawn below the LCD area.
pub const STRIP_HEIGHT: u32 = 16;

pub struct SimPlatform;

impl Platform for SimPlatform {
    type Bus = SimBus;
    type Display = LcdSink<SimPanel>;
    type Leds = GpioStatusLeds<'static, SimPin, SimPin, SimPin>;
    type Power = FixedClock;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic clock counting from simulator start.
pub struct SimClock {
    started: StdInstant,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            started: StdInstant::now(),
        }
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.started.elapsed().as_micros() as u64)
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// 128x128 monochrome LCD backed by a simulator display.
///
/// The panel reports not ready for a warm-up period after creation, like a
/// controller that is still running its power-on sequence.
pub struct SimPanel {
    display: SimulatorDisplay<BinaryColor>,
    ready_at: StdInstant,
}

impl SimPanel {
    pub fn new(warm_up: StdDuration) -> Self {
        Self {
            display: SimulatorDisplay::new(Size::new(WIDTH as u32, HEIGHT as u32 + STRIP_HEIGHT)),
            ready_at: StdInstant::now() + warm_up,
        }
    }

    pub fn display(&self) -> &SimulatorDisplay<BinaryColor> {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut SimulatorDisplay<BinaryColor> {
        &mut self.display
    }
}

impl OriginDimensions for SimPanel {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for SimPanel {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.display.draw_iter(pixels)
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.display.fill_contiguous(area, colors)
    }
}

impl Panel for SimPanel {
    fn is_ready(&self) -> bool {
        StdInstant::now() >= self.ready_at
    }
}

// ---------------------------------------------------------------------------
// Pins
// ---------------------------------------------------------------------------

/// Output pin whose level is shared with the window for drawing.
pub struct SimPin {
    name: &'static str,
    level: Rc<Cell<bool>>,
}

impl SimPin {
    pub fn new(name: &'static str, level: Rc<Cell<bool>>) -> Self {
        Self { name, level }
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("{} LED off", self.name);
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!("{} LED on", self.name);
        self.level.set(true);
        Ok(())
    }
}

/// Push button driven by the keyboard.
pub struct SimButton {
    pressed: Rc<Cell<bool>>,
}

impl SimButton {
    pub fn new(pressed: Rc<Cell<bool>>) -> Self {
        Self { pressed }
    }
}

impl ErrorType for SimButton {
    type Error = Infallible;
}

impl InputPin for SimButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pressed.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pressed.get())
    }
}
