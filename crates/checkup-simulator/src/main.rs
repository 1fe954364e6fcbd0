//! Desktop simulator for the checkup sensor health-check firmware.
//!
//! Runs the checkup-core scheduler against an emulated I2C bus and renders
//! the status screen in an SDL2 window via `embedded-graphics-simulator`.
//! The strip below the screen mirrors the board LED and the two status LEDs.
//!
//! # Key bindings
//!
//! | Key   | Action                          |
//! |-------|---------------------------------|
//! | 1     | Toggle TMP112 fault             |
//! | 2     | Toggle LIS2DH12 fault           |
//! | 3     | Toggle SHT30 fault              |
//! | 4     | Toggle OPT3001 fault            |
//! | 5     | Toggle M24C04 fault             |
//! | 6     | Toggle SI7210 fault             |
//! | Space | Hold the user button            |
//! | Q     | Quit                            |

mod board;
mod devices;
mod settings;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use log::{error, info};

use checkup_core::display::{HEIGHT, LcdSink};
use checkup_core::led::GpioStatusLeds;
use checkup_core::power::FixedClock;
use checkup_core::{Clock, PlanRequests, Resources, Scheduler, Step, on_init};

use board::{STRIP_HEIGHT, SimButton, SimClock, SimPanel, SimPin, SimPlatform};
use devices::SimBus;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 3;

/// Target frame duration (~30 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Time the emulated LCD controller needs before it accepts frames.
const PANEL_WARM_UP: Duration = Duration::from_millis(200);

static REQUESTS: PlanRequests = PlanRequests::new();

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn keycode_to_device(keycode: Keycode) -> Option<usize> {
    match keycode {
        Keycode::Num1 | Keycode::Kp1 => Some(0),
        Keycode::Num2 | Keycode::Kp2 => Some(1),
        Keycode::Num3 | Keycode::Kp3 => Some(2),
        Keycode::Num4 | Keycode::Kp4 => Some(3),
        Keycode::Num5 | Keycode::Kp5 => Some(4),
        Keycode::Num6 | Keycode::Kp6 => Some(5),
        _ => None,
    }
}

/// Draw the LED indicators into the strip below the LCD area.
fn draw_led_strip(display: &mut SimulatorDisplay<BinaryColor>, levels: [bool; 3]) {
    let top = HEIGHT as i32;
    let strip = Rectangle::new(
        Point::new(0, top),
        Size::new(display.size().width, STRIP_HEIGHT),
    );
    let Ok(()) = display.fill_solid(&strip, BinaryColor::Off);

    let label = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    for ((x, name), lit) in [(8, "B"), (50, "G"), (92, "R")].into_iter().zip(levels) {
        let style = if lit {
            PrimitiveStyle::with_fill(BinaryColor::On)
        } else {
            PrimitiveStyle::with_stroke(BinaryColor::On, 1)
        };
        let Ok(_) = Circle::new(Point::new(x, top + 3), 10)
            .into_styled(style)
            .draw(display);
        let Ok(_) = Text::with_baseline(name, Point::new(x + 14, top + 3), label, Baseline::Top)
            .draw(display);
    }
}

/// Sleep until the next task is due or the next frame, whichever is first.
fn idle<C: Clock>(clock: &C, next_due: Option<embassy_time::Instant>, frame_left: Duration) {
    let wait = next_due
        .and_then(|at| at.checked_duration_since(clock.now()))
        .map(|d| Duration::from_micros(d.as_micros()))
        .map_or(frame_left, |d| d.min(frame_left));
    if !wait.is_zero() {
        std::thread::sleep(wait);
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    let config = settings::load();

    let board = Rc::new(Cell::new(false));
    let green = Rc::new(Cell::new(false));
    let red = Rc::new(Cell::new(false));
    let pressed = Rc::new(Cell::new(false));

    let bus = SimBus::new();
    let addresses = bus.addresses();
    let leds = GpioStatusLeds::new(
        SimPin::new("board", Rc::clone(&board)),
        SimPin::new("green", Rc::clone(&green)),
        SimPin::new("red", Rc::clone(&red)),
        &REQUESTS,
    );
    let mut resources: Resources<SimPlatform> = Resources::new(
        bus,
        LcdSink::new(SimPanel::new(PANEL_WARM_UP)),
        leds,
        FixedClock,
    );

    let mut scheduler = Scheduler::new(SimClock::new(), &REQUESTS);
    if let Err(e) = on_init(
        &mut scheduler,
        &mut resources,
        &config,
        SimButton::new(Rc::clone(&pressed)),
    ) {
        error!("Boot failed: {}", e);
        return;
    }

    let output_settings = OutputSettingsBuilder::new()
        .theme(BinaryColorTheme::LcdWhite)
        .scale(WINDOW_SCALE)
        .build();
    let mut window = Window::new("Checkup Simulator", &output_settings);

    // The SDL window is lazily initialized on the first `update()` call.
    window.update(resources.display.panel().display());

    info!("Simulator started. Keys 1-6 toggle device faults, Space is the button, Q quits.");

    let mut last_frame = Instant::now();

    'running: loop {
        let step = scheduler.run_once(&mut resources);

        let since_frame = last_frame.elapsed();
        if since_frame < FRAME_DURATION {
            if let Step::Idle { next_due } = step {
                idle(scheduler.clock(), next_due, FRAME_DURATION - since_frame);
            }
            continue;
        }
        last_frame = Instant::now();

        // --- SDL events ---------------------------------------------------
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown {
                    keycode, repeat, ..
                } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }
                    if keycode == Keycode::Space {
                        pressed.set(true);
                    } else if let Some(index) = keycode_to_device(keycode) {
                        if repeat {
                            continue;
                        }
                        if let Some(&address) = addresses.get(index) {
                            let faulted = resources.bus.toggle_fault(address);
                            info!(
                                "Device {:#04x} {}",
                                address,
                                if faulted { "faulted" } else { "restored" }
                            );
                        }
                    }
                }
                SimulatorEvent::KeyUp { keycode, .. } if keycode == Keycode::Space => {
                    pressed.set(false);
                }
                _ => {}
            }
        }

        // --- Present ------------------------------------------------------
        let panel = resources.display.panel_mut();
        draw_led_strip(panel.display_mut(), [board.get(), green.get(), red.get()]);
        window.update(panel.display());
    }

    info!("Simulator exiting");
}
