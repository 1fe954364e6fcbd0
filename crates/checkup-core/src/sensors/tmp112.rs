use embassy_time::Duration;

use super::{SensorError, SensorKind};
use crate::bus::BusAdapter;

const REG_TEMPERATURE: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

/// Shutdown mode, 12-bit resolution.
const CONFIG_SHUTDOWN: [u8; 2] = [0x01, 0x80];
/// Shutdown mode plus the one-shot trigger.
const CONFIG_ONE_SHOT: [u8; 2] = [0x81, 0x80];
/// One-shot done (OS) and shutdown (SD) bits of the config MSB.
const CONVERSION_DONE: u8 = 0x81;

const CONVERSION_TIME: Duration = Duration::from_millis(35);

/// TMP112 temperature sensor, one-shot conversions in shutdown mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tmp112;

impl Tmp112 {
    /// Convert the temperature register to degrees Celsius.
    pub fn decode(raw: [u8; 2]) -> f32 {
        let counts = i16::from_be_bytes(raw) >> 4;
        counts as f32 / 16.0
    }
}

impl SensorKind for Tmp112 {
    type Value = f32;
    const NAME: &'static str = "TMP112";

    fn initialize<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError> {
        bus.write_register(address, REG_CONFIG, &CONFIG_SHUTDOWN)?;
        Ok(Duration::from_ticks(0))
    }

    fn start_measurement<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError> {
        bus.write_register(address, REG_CONFIG, &CONFIG_ONE_SHOT)?;
        Ok(CONVERSION_TIME)
    }

    fn read<B: BusAdapter>(&mut self, bus: &mut B, address: u8) -> Result<f32, SensorError> {
        let mut config = [0u8; 2];
        bus.read_register(address, REG_CONFIG, &mut config)?;
        if config[0] & CONVERSION_DONE != CONVERSION_DONE {
            return Err(SensorError::NotReady);
        }

        let mut raw = [0u8; 2];
        bus.read_register(address, REG_TEMPERATURE, &mut raw)?;
        Ok(Self::decode(raw))
    }
}
