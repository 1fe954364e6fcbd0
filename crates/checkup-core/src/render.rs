//! Aggregation and render task.
//!
//! Once per period: compute the overall verdict, pulse the matching status
//! LED and draw one status row per channel plus a large banner.

use embassy_time::Duration;
use log::{error, info};

use crate::app::{Platform, Resources};
use crate::display::{DisplaySink, Font, NumberFormat};
use crate::health::HealthPolicy;
use crate::led::{LedControl, StatusLed};
use crate::power::HighSpeedClock;
use crate::scheduler::{Task, TaskContext};
use crate::store::ReadingStore;

const ROW_TOP: i32 = 5;
const ROW_PITCH: i32 = 15;
const LABEL_X: i32 = 5;
const STATUS_X: i32 = 70;
const VALUE_X: i32 = 100;
const BANNER_X: i32 = 5;
const BANNER_Y: i32 = 100;

pub const BANNER_OK: &str = "OK OK OK";
pub const BANNER_ERROR: &str = "ERROR";

pub struct RenderTask {
    policy: HealthPolicy,
    pulse: Duration,
    period: Duration,
}

impl RenderTask {
    pub fn new(policy: HealthPolicy, pulse: Duration, period: Duration) -> Self {
        Self {
            policy,
            pulse,
            period,
        }
    }
}

/// Draw the status rows and the verdict banner into `display`.
pub fn draw_status<D: DisplaySink + ?Sized>(display: &mut D, store: &ReadingStore, healthy: bool) {
    display.clear();
    display.set_font(Font::Regular);

    for (row, status) in store.statuses().enumerate() {
        let y = ROW_TOP + ROW_PITCH * row as i32;
        display.draw_text(LABEL_X, y, status.id.label());
        display.draw_text(STATUS_X, y, if status.valid { "ok" } else { "err" });

        if let (Some(decimals), Some(reading)) = (status.id.decimals(), status.reading) {
            display.draw_formatted_number(VALUE_X, y, NumberFormat::Fixed(decimals), reading);
        }
    }

    display.set_font(Font::Large);
    display.draw_text(
        BANNER_X,
        BANNER_Y,
        if healthy { BANNER_OK } else { BANNER_ERROR },
    );
}

impl<P: Platform> Task<Resources<P>> for RenderTask {
    fn run(&mut self, cx: &mut Resources<P>, sched: &mut TaskContext<'_>) {
        let Resources {
            store,
            display,
            leds,
            power,
            ..
        } = cx;

        if !display.is_ready() {
            sched.plan_current_now();
            return;
        }

        let clock = HighSpeedClock::enable(power);

        let healthy = self.policy.assess(store);
        if healthy {
            info!("OK");
        } else {
            error!("ERROR");
        }

        leds.pulse(
            if healthy {
                StatusLed::Green
            } else {
                StatusLed::Red
            },
            self.pulse,
        );

        draw_status(display, store, healthy);
        if let Err(e) = display.commit() {
            error!("Display commit failed: {}", e);
        }

        drop(clock);
        sched.plan_current_from_now(self.period);
    }

    fn name(&self) -> &'static str {
        "render"
    }
}
