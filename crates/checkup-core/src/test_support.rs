//! Host fakes shared by the unit tests.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::convert::Infallible;
use embassy_time::{Duration, Instant};
use embedded_hal::digital::{ErrorType, InputPin};
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

use crate::app::{Platform, Resources};
use crate::bus::{BusAdapter, BusError};
use crate::display::{DisplayError, DisplaySink, Font};
use crate::led::{LedControl, StatusLed};
use crate::power::ClockControl;
use crate::sensors::SensorContext;
use crate::store::ReadingStore;

/// Scripted bus: register reads answer from a table, plain reads from a
/// per-device frame, every write is recorded.
#[derive(Debug, Default)]
pub struct FakeBus {
    registers: BTreeMap<(u8, u8), Vec<u8>>,
    frames: BTreeMap<u8, Vec<u8>>,
    failing: BTreeSet<u8>,
    writes: Vec<(u8, Vec<u8>)>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every device on the board answering with plausible readings.
    pub fn healthy() -> Self {
        Self::new()
            .with_register(0x48, 0x01, &[0x81, 0x80])
            .with_register(0x48, 0x00, &[0x16, 0x80])
            .with_register(0x19, 0x0F, &[0x33])
            .with_register(0x19, 0x27, &[0x0F])
            .with_register(0x19, 0xA8, &[0x00, 0x00, 0x00, 0x00, 0x80, 0x3E])
            .with_read(0x45, &[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2])
            .with_register(0x44, 0x7F, &[0x30, 0x01])
            .with_register(0x44, 0x01, &[0xC8, 0x90])
            .with_register(0x44, 0x00, &[0x63, 0x45])
            .with_register(0x51, 0x00, &[0xAB; 16])
            .with_register(0x32, 0xC0, &[0x14])
    }

    pub fn with_register(mut self, device: u8, register: u8, data: &[u8]) -> Self {
        self.registers.insert((device, register), data.to_vec());
        self
    }

    pub fn with_read(mut self, device: u8, data: &[u8]) -> Self {
        self.frames.insert(device, data.to_vec());
        self
    }

    /// Make every transaction with `device` fail with a NACK.
    pub fn fail_device(&mut self, device: u8) {
        self.failing.insert(device);
    }

    pub fn restore_device(&mut self, device: u8) {
        self.failing.remove(&device);
    }

    pub fn writes_to(&self, device: u8) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|(d, _)| *d == device)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    fn check(&self, device: u8) -> Result<(), BusError> {
        if self.failing.contains(&device) {
            Err(nack(device))
        } else {
            Ok(())
        }
    }
}

fn nack(device: u8) -> BusError {
    BusError::new(
        device,
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
    )
}

fn fill(buffer: &mut [u8], data: &[u8]) {
    let len = buffer.len().min(data.len());
    buffer[..len].copy_from_slice(&data[..len]);
}

impl BusAdapter for FakeBus {
    fn write(&mut self, device: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.check(device)?;
        self.writes.push((device, bytes.to_vec()));
        Ok(())
    }

    fn read(&mut self, device: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.check(device)?;
        let data = self.frames.get(&device).ok_or(nack(device))?;
        fill(buffer, data);
        Ok(())
    }

    fn write_read(
        &mut self,
        device: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        self.check(device)?;
        let register = bytes.first().copied().ok_or(nack(device))?;
        let data = self
            .registers
            .get(&(device, register))
            .ok_or(nack(device))?;
        fill(buffer, data);
        Ok(())
    }
}

/// Bus plus store, the minimum context a sensor task needs.
pub struct SensorRig {
    pub bus: FakeBus,
    pub store: ReadingStore,
}

impl SensorRig {
    pub fn new(bus: FakeBus) -> Self {
        Self {
            bus,
            store: ReadingStore::new(),
        }
    }
}

impl SensorContext for SensorRig {
    type Bus = FakeBus;

    fn bus_and_store(&mut self) -> (&mut FakeBus, &mut ReadingStore) {
        (&mut self.bus, &mut self.store)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear,
    Font(Font),
    Text { x: i32, y: i32, text: String },
    Commit,
}

pub struct RecordingDisplay {
    pub ready: bool,
    pub fail_commit: bool,
    pub calls: Vec<DrawCall>,
}

impl DisplaySink for RecordingDisplay {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
    }

    fn set_font(&mut self, font: Font) {
        self.calls.push(DrawCall::Font(font));
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        self.calls.push(DrawCall::Text {
            x,
            y,
            text: text.to_string(),
        });
    }

    fn commit(&mut self) -> Result<(), DisplayError> {
        self.calls.push(DrawCall::Commit);
        if self.fail_commit {
            Err(DisplayError::Flush)
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct RecordingLeds {
    pub pulses: Vec<(StatusLed, Duration)>,
}

impl LedControl for RecordingLeds {
    fn pulse(&mut self, led: StatusLed, duration: Duration) {
        self.pulses.push((led, duration));
    }

    fn service(&mut self, _now: Instant) -> Option<Instant> {
        None
    }
}

#[derive(Default)]
pub struct CountingPower {
    pub enabled: bool,
    pub enables: u32,
}

impl ClockControl for CountingPower {
    fn enable_high_speed(&mut self) {
        self.enabled = true;
        self.enables += 1;
    }

    fn disable_high_speed(&mut self) {
        self.enabled = false;
    }
}

/// Button input that is never pressed.
pub struct ReleasedButton;

impl ErrorType for ReleasedButton {
    type Error = Infallible;
}

impl InputPin for ReleasedButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

pub struct TestPlatform;

impl Platform for TestPlatform {
    type Bus = FakeBus;
    type Display = RecordingDisplay;
    type Leds = RecordingLeds;
    type Power = CountingPower;
}

pub fn test_resources(bus: FakeBus) -> Resources<TestPlatform> {
    Resources::new(
        bus,
        RecordingDisplay {
            ready: true,
            fail_commit: false,
            calls: Vec::new(),
        },
        RecordingLeds::default(),
        CountingPower::default(),
    )
}
