//! Sensor drivers
//!
//! Each sensor kind implements [`SensorKind`]: three synchronous bus steps
//! (initialize, start a measurement, read the result). [`SensorDriver`] turns
//! a kind into a scheduler task that walks the acquisition state machine
//!
//! ```text
//! Initialize -> Measure -> Read -> (completion) -> Measure -> ...
//! ```
//!
//! re-arming itself for every settle and conversion time instead of waiting.
//! Outcomes are delivered to a [`CompletionHandler`], normally a
//! [`ChannelBinding`] that writes into the [`ReadingStore`].

mod lis2dh12;
mod m24c04;
mod opt3001;
mod sht30;
mod si7210;
mod tmp112;

pub use lis2dh12::Lis2dh12;
pub use m24c04::EepromProbe;
pub use opt3001::Opt3001;
pub use sht30::Sht30;
pub use si7210::HallProbe;
pub use tmp112::Tmp112;

use alloc::boxed::Box;
use core::fmt::Debug;
use embassy_time::{Duration, Instant};
use log::{debug, warn};
use thiserror_no_std::Error;

use crate::bus::{BusAdapter, BusError};
use crate::scheduler::{Task, TaskContext};
use crate::store::{Channel, ReadingStore, Unknown};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("Bus failure: {0}")]
    Bus(BusError),
    #[error("Measurement not ready")]
    NotReady,
    #[error("Checksum mismatch")]
    Checksum,
    #[error("Reading out of range")]
    OutOfRange,
    #[error("Unexpected device (expected id {expected:#06x}, found {found:#06x})")]
    UnexpectedDevice { expected: u16, found: u16 },
}

impl From<BusError> for SensorError {
    fn from(error: BusError) -> Self {
        SensorError::Bus(error)
    }
}

/// Outcome of one acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent<V> {
    Update(V),
    Error(SensorError),
}

/// Receives the outcome of every acquisition attempt of one driver.
pub trait CompletionHandler<V> {
    fn on_complete(&mut self, store: &mut ReadingStore, event: SensorEvent<V>);
}

impl<V, F> CompletionHandler<V> for F
where
    F: FnMut(&mut ReadingStore, SensorEvent<V>),
{
    fn on_complete(&mut self, store: &mut ReadingStore, event: SensorEvent<V>) {
        self(store, event)
    }
}

/// Completion handler writing into one channel of the store.
pub struct ChannelBinding<V: Unknown> {
    name: &'static str,
    select: fn(&mut ReadingStore) -> &mut Channel<V>,
}

impl<V: Unknown> ChannelBinding<V> {
    pub const fn new(name: &'static str, select: fn(&mut ReadingStore) -> &mut Channel<V>) -> Self {
        Self { name, select }
    }
}

impl<V: Unknown + Debug> CompletionHandler<V> for ChannelBinding<V> {
    fn on_complete(&mut self, store: &mut ReadingStore, event: SensorEvent<V>) {
        let channel = (self.select)(store);
        let outcome = match event {
            SensorEvent::Update(value) => Ok(value),
            SensorEvent::Error(error) => Err(error),
        };

        if let Err(error) = &outcome {
            warn!("{}: {}", self.name, error);
        }
        let valid = channel.record(outcome);
        debug!("{}: {}, {:?}", self.name, valid, channel.value());
    }
}

/// Shared state a sensor task needs from the application context.
pub trait SensorContext {
    type Bus: BusAdapter;

    fn bus_and_store(&mut self) -> (&mut Self::Bus, &mut ReadingStore);
}

/// Register-level protocol of one sensor part.
pub trait SensorKind {
    type Value: Copy + Debug;

    /// Part name used in log output.
    const NAME: &'static str;

    /// Bring the device into a known state. Returns the settle time before
    /// the first measurement may be started.
    fn initialize<B: BusAdapter>(&mut self, bus: &mut B, address: u8)
    -> Result<Duration, SensorError>;

    /// Trigger a conversion. Returns the conversion time.
    fn start_measurement<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError>;

    /// Fetch and decode the finished conversion.
    fn read<B: BusAdapter>(&mut self, bus: &mut B, address: u8)
    -> Result<Self::Value, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initialize,
    Measure,
    Read,
}

/// Periodic acquisition task for one sensor.
pub struct SensorDriver<K: SensorKind> {
    kind: K,
    address: u8,
    phase: Phase,
    update_interval: Option<Duration>,
    cycle_start: Instant,
    handler: Option<Box<dyn CompletionHandler<K::Value>>>,
}

impl<K: SensorKind> SensorDriver<K> {
    pub fn new(kind: K, address: u8) -> Self {
        Self {
            kind,
            address,
            phase: Phase::Initialize,
            update_interval: None,
            cycle_start: Instant::from_ticks(0),
            handler: None,
        }
    }

    /// Replace the completion handler.
    pub fn set_event_handler(&mut self, handler: Box<dyn CompletionHandler<K::Value>>) {
        self.handler = Some(handler);
    }

    /// Period between the starts of two acquisitions. Without one, the driver
    /// initializes the device and then stays dormant.
    pub fn set_update_interval(&mut self, interval: Duration) {
        self.update_interval = Some(interval);
    }

    fn complete(&mut self, store: &mut ReadingStore, event: SensorEvent<K::Value>) {
        match self.handler.as_mut() {
            Some(handler) => handler.on_complete(store, event),
            None => debug!("{}: no handler for {:?}", K::NAME, event),
        }
    }

    fn fail(&mut self, store: &mut ReadingStore, sched: &mut TaskContext<'_>, error: SensorError) {
        self.complete(store, SensorEvent::Error(error));
        self.phase = Phase::Initialize;
        if let Some(interval) = self.update_interval {
            sched.plan_current_from_now(interval);
        }
    }
}

impl<K: SensorKind, Ctx: SensorContext> Task<Ctx> for SensorDriver<K> {
    fn run(&mut self, cx: &mut Ctx, sched: &mut TaskContext<'_>) {
        let (bus, store) = cx.bus_and_store();

        match self.phase {
            Phase::Initialize => match self.kind.initialize(bus, self.address) {
                Ok(settle) => {
                    self.phase = Phase::Measure;
                    if self.update_interval.is_some() {
                        sched.plan_current_from_now(settle);
                    }
                }
                Err(error) => self.fail(store, sched, error),
            },
            Phase::Measure => {
                self.cycle_start = sched.dispatched_at();
                match self.kind.start_measurement(bus, self.address) {
                    Ok(conversion) => {
                        self.phase = Phase::Read;
                        sched.plan_current_from_now(conversion);
                    }
                    Err(error) => self.fail(store, sched, error),
                }
            }
            Phase::Read => match self.kind.read(bus, self.address) {
                Ok(value) => {
                    self.complete(store, SensorEvent::Update(value));
                    self.phase = Phase::Measure;
                    if let Some(interval) = self.update_interval {
                        let next = self
                            .cycle_start
                            .checked_add(interval)
                            .unwrap_or(Instant::MAX);
                        sched.plan_current_absolute(next);
                    }
                }
                Err(error) => self.fail(store, sched, error),
            },
        }
    }

    fn name(&self) -> &'static str {
        K::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualClock, PlanRequests, Scheduler, Step};
    use crate::test_support::{FakeBus, SensorRig};
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    const ADDRESS: u8 = 0x60;

    /// Kind with fixed timings whose steps succeed unless the bus says so.
    struct Probe;

    impl SensorKind for Probe {
        type Value = u8;
        const NAME: &'static str = "probe";

        fn initialize<B: BusAdapter>(
            &mut self,
            bus: &mut B,
            address: u8,
        ) -> Result<Duration, SensorError> {
            bus.write(address, &[0x01])?;
            Ok(Duration::from_millis(2))
        }

        fn start_measurement<B: BusAdapter>(
            &mut self,
            bus: &mut B,
            address: u8,
        ) -> Result<Duration, SensorError> {
            bus.write(address, &[0x02])?;
            Ok(Duration::from_millis(30))
        }

        fn read<B: BusAdapter>(&mut self, bus: &mut B, address: u8) -> Result<u8, SensorError> {
            let mut buffer = [0u8; 1];
            bus.read(address, &mut buffer)?;
            Ok(buffer[0])
        }
    }

    fn driver(events: &Rc<RefCell<Vec<SensorEvent<u8>>>>) -> SensorDriver<Probe> {
        let events = events.clone();
        let mut driver = SensorDriver::new(Probe, ADDRESS);
        driver.set_update_interval(Duration::from_millis(1000));
        driver.set_event_handler(Box::new(
            move |_: &mut ReadingStore, event: SensorEvent<u8>| events.borrow_mut().push(event),
        ));
        driver
    }

    #[test]
    fn test_cycle_walks_initialize_measure_read() {
        let clock = ManualClock::new();
        let requests = PlanRequests::new();
        let mut scheduler: Scheduler<'_, SensorRig, _> = Scheduler::new(&clock, &requests);
        let mut rig = SensorRig::new(FakeBus::new().with_read(ADDRESS, &[0x2A]));
        let events = Rc::default();

        let id = scheduler
            .register(Box::new(driver(&events)), Duration::from_ticks(0))
            .unwrap();

        assert_eq!(scheduler.run_once(&mut rig), Step::Ran(id));
        assert_eq!(scheduler.planned_at(id), Some(Instant::from_millis(2)));

        clock.set(Instant::from_millis(2));
        scheduler.run_once(&mut rig);
        assert_eq!(scheduler.planned_at(id), Some(Instant::from_millis(32)));

        clock.set(Instant::from_millis(32));
        scheduler.run_once(&mut rig);

        assert_eq!(*events.borrow(), [SensorEvent::Update(0x2A)]);
        // Next cycle starts one interval after the previous measurement.
        assert_eq!(scheduler.planned_at(id), Some(Instant::from_millis(1002)));
    }

    #[test]
    fn test_failure_reports_error_and_reinitializes() {
        let clock = ManualClock::new();
        let requests = PlanRequests::new();
        let mut scheduler: Scheduler<'_, SensorRig, _> = Scheduler::new(&clock, &requests);
        let mut rig = SensorRig::new(FakeBus::new().with_read(ADDRESS, &[0x2A]));
        let events: Rc<RefCell<Vec<SensorEvent<u8>>>> = Rc::default();

        let mut probe = driver(&events);
        probe.phase = Phase::Read;
        let id = scheduler
            .register(Box::new(probe), Duration::from_ticks(0))
            .unwrap();

        rig.bus.fail_device(ADDRESS);
        scheduler.run_once(&mut rig);

        assert!(matches!(
            events.borrow()[0],
            SensorEvent::Error(SensorError::Bus(_))
        ));
        // Retried one interval later, starting from initialization.
        assert_eq!(scheduler.planned_at(id), Some(Instant::from_millis(1000)));

        rig.bus.restore_device(ADDRESS);
        clock.set(Instant::from_millis(1000));
        scheduler.run_once(&mut rig);
        assert_eq!(rig.bus.writes_to(ADDRESS), [[0x01]]);
    }

    #[test]
    fn test_driver_without_interval_stays_dormant_after_init() {
        let clock = ManualClock::new();
        let requests = PlanRequests::new();
        let mut scheduler: Scheduler<'_, SensorRig, _> = Scheduler::new(&clock, &requests);
        let mut rig = SensorRig::new(FakeBus::new());

        let id = scheduler
            .register(Box::new(SensorDriver::new(Probe, ADDRESS)), Duration::from_ticks(0))
            .unwrap();
        scheduler.run_once(&mut rig);

        assert_eq!(scheduler.planned_at(id), None);
    }

    #[test]
    fn test_channel_binding_invalidates_then_validates() {
        let mut store = ReadingStore::new();
        fn hall(store: &mut ReadingStore) -> &mut Channel<u8> {
            &mut store.hall
        }
        let mut binding = ChannelBinding::new("SI7210", hall);

        binding.on_complete(&mut store, SensorEvent::Update(0x10));
        assert!(store.hall.is_valid());

        binding.on_complete(&mut store, SensorEvent::Error(SensorError::NotReady));
        assert!(!store.hall.is_valid());
        assert_eq!(store.hall.value(), 0xFF);
    }

    #[test]
    fn test_bus_error_converts_into_sensor_error() {
        use embedded_hal::i2c::ErrorKind;

        let error: SensorError = BusError::new(0x48, ErrorKind::Bus).into();
        assert_eq!(error, SensorError::Bus(BusError::new(0x48, ErrorKind::Bus)));
    }
}
