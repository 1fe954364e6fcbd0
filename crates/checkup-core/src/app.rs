//! Application wiring
//!
//! [`Platform`] names the concrete peripherals of a target, [`Resources`]
//! owns them together with the [`ReadingStore`], and [`on_init`] registers
//! every driver and task with the scheduler once at boot.

use alloc::boxed::Box;
use embassy_time::Duration;
use embedded_hal::digital::InputPin;
use log::{info, warn};

use crate::bus::BusAdapter;
use crate::button::ButtonTask;
use crate::config::AppConfig;
use crate::display::DisplaySink;
use crate::health::HealthPolicy;
use crate::led::{LedControl, LedTask, StatusLed};
use crate::power::ClockControl;
use crate::render::RenderTask;
use crate::scheduler::{Clock, Scheduler, SchedulerError, TaskId};
use crate::sensors::{
    ChannelBinding, EepromProbe, HallProbe, Lis2dh12, Opt3001, SensorContext, SensorDriver,
    SensorKind, Sht30, Tmp112,
};
use crate::store::{Acceleration, Channel, ReadingStore, Unknown};

/// Peripheral types of one target.
pub trait Platform {
    type Bus: BusAdapter;
    type Display: DisplaySink;
    type Leds: LedControl;
    type Power: ClockControl;
}

/// Everything a task may touch, handed to each task body by `&mut`.
pub struct Resources<P: Platform> {
    pub store: ReadingStore,
    pub bus: P::Bus,
    pub display: P::Display,
    pub leds: P::Leds,
    pub power: P::Power,
}

impl<P: Platform> Resources<P> {
    pub fn new(bus: P::Bus, display: P::Display, leds: P::Leds, power: P::Power) -> Self {
        Self {
            store: ReadingStore::new(),
            bus,
            display,
            leds,
            power,
        }
    }
}

impl<P: Platform> SensorContext for Resources<P> {
    type Bus = P::Bus;

    fn bus_and_store(&mut self) -> (&mut P::Bus, &mut ReadingStore) {
        (&mut self.bus, &mut self.store)
    }
}

/// Ids of the tasks registered by [`on_init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootTasks {
    pub tmp112: TaskId,
    pub lis2dh12: TaskId,
    pub sht30: TaskId,
    pub opt3001: TaskId,
    pub m24c04: TaskId,
    pub si7210: TaskId,
    pub leds: TaskId,
    pub button: TaskId,
    pub render: TaskId,
}

fn temperature(store: &mut ReadingStore) -> &mut Channel<f32> {
    &mut store.temperature
}

fn acceleration(store: &mut ReadingStore) -> &mut Channel<Acceleration> {
    &mut store.acceleration
}

fn humidity(store: &mut ReadingStore) -> &mut Channel<f32> {
    &mut store.humidity
}

fn illuminance(store: &mut ReadingStore) -> &mut Channel<f32> {
    &mut store.illuminance
}

fn driver<K>(
    kind: K,
    address: u8,
    interval: Duration,
    select: fn(&mut ReadingStore) -> &mut Channel<K::Value>,
) -> Box<SensorDriver<K>>
where
    K: SensorKind + 'static,
    K::Value: Unknown + 'static,
{
    let mut driver = SensorDriver::new(kind, address);
    driver.set_event_handler(Box::new(ChannelBinding::new(K::NAME, select)));
    driver.set_update_interval(interval);
    Box::new(driver)
}

/// Register every driver and task. Call exactly once, before the scheduler
/// loop starts.
pub fn on_init<P, C, B>(
    scheduler: &mut Scheduler<'_, Resources<P>, C>,
    resources: &mut Resources<P>,
    config: &AppConfig,
    button: B,
) -> Result<BootTasks, SchedulerError>
where
    P: Platform,
    C: Clock,
    B: InputPin + 'static,
{
    if config.health_policy == HealthPolicy::InvertedTemperature {
        warn!("Health verdict requires a FAILED temperature sensor (inverted policy)");
    }

    let now = Duration::from_ticks(0);
    let addresses = config.addresses;
    let interval = config.sensor_interval;

    let tmp112 = scheduler.register(
        driver(Tmp112, addresses.tmp112, interval, temperature),
        now,
    )?;
    let lis2dh12 = scheduler.register(
        driver(Lis2dh12, addresses.lis2dh12, interval, acceleration),
        now,
    )?;
    let sht30 = scheduler.register(driver(Sht30, addresses.sht30, interval, humidity), now)?;
    let opt3001 = scheduler.register(
        driver(Opt3001, addresses.opt3001, interval, illuminance),
        now,
    )?;

    let m24c04 = scheduler.register(
        Box::new(EepromProbe::new(addresses.m24c04, config.probe_interval)),
        now,
    )?;
    let si7210 = scheduler.register(
        Box::new(HallProbe::new(addresses.si7210, config.probe_interval)),
        now,
    )?;

    let leds = scheduler.register(Box::new(LedTask), now)?;
    resources.leds.bind_task(leds);
    resources.leds.pulse(StatusLed::Board, config.boot_pulse);

    let button = scheduler.register(Box::new(ButtonTask::new(button, config.button_scan)), now)?;

    let render = scheduler.register(
        Box::new(RenderTask::new(
            config.health_policy,
            config.led_pulse,
            config.render_interval,
        )),
        now,
    )?;

    info!("Registered {} tasks", scheduler.len());

    Ok(BootTasks {
        tmp112,
        lis2dh12,
        sht30,
        opt3001,
        m24c04,
        si7210,
        leds,
        button,
        render,
    })
}
