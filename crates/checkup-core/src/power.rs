//! Core clock control.
//!
//! Rendering a frame is the only work that needs the high-speed clock. The
//! [`HighSpeedClock`] guard enables it on construction and disables it when
//! dropped, so it brackets exactly the scope it lives in.

use log::trace;

pub trait ClockControl {
    fn enable_high_speed(&mut self);
    fn disable_high_speed(&mut self);
}

/// Clock control for targets without a switchable PLL.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedClock;

impl ClockControl for FixedClock {
    fn enable_high_speed(&mut self) {}
    fn disable_high_speed(&mut self) {}
}

/// Keeps the high-speed clock enabled while alive.
pub struct HighSpeedClock<'a, C: ClockControl + ?Sized> {
    control: &'a mut C,
}

impl<'a, C: ClockControl + ?Sized> HighSpeedClock<'a, C> {
    pub fn enable(control: &'a mut C) -> Self {
        trace!("High-speed clock on");
        control.enable_high_speed();
        Self { control }
    }
}

impl<C: ClockControl + ?Sized> Drop for HighSpeedClock<'_, C> {
    fn drop(&mut self) {
        self.control.disable_high_speed();
        trace!("High-speed clock off");
    }
}
