use embassy_time::Duration;

use super::{SensorError, SensorKind};
use crate::bus::BusAdapter;

const REG_RESULT: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;
const REG_DEVICE_ID: u8 = 0x7F;

const DEVICE_ID: u16 = 0x3001;

/// Automatic full-scale range, 800 ms conversion, shutdown.
const CONFIG_SHUTDOWN: [u8; 2] = [0xC8, 0x10];
/// Same as [`CONFIG_SHUTDOWN`] with single-shot mode selected.
const CONFIG_SINGLE_SHOT: [u8; 2] = [0xCA, 0x10];
/// Conversion ready flag in the config LSB.
const CONFIG_CRF: u8 = 0x80;

const CONVERSION_TIME: Duration = Duration::from_millis(1000);
const MAX_EXPONENT: u16 = 11;

/// OPT3001 ambient light sensor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Opt3001;

impl Opt3001 {
    /// Convert the result register (4-bit exponent, 12-bit mantissa) to lux.
    pub fn decode(raw: u16) -> Result<f32, SensorError> {
        let exponent = raw >> 12;
        let mantissa = raw & 0x0FFF;
        if exponent > MAX_EXPONENT {
            return Err(SensorError::OutOfRange);
        }

        Ok(0.01 * (1u32 << exponent) as f32 * mantissa as f32)
    }
}

impl SensorKind for Opt3001 {
    type Value = f32;
    const NAME: &'static str = "OPT3001";

    fn initialize<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError> {
        let mut id = [0u8; 2];
        bus.read_register(address, REG_DEVICE_ID, &mut id)?;
        let found = u16::from_be_bytes(id);
        if found != DEVICE_ID {
            return Err(SensorError::UnexpectedDevice {
                expected: DEVICE_ID,
                found,
            });
        }

        bus.write_register(address, REG_CONFIG, &CONFIG_SHUTDOWN)?;
        Ok(Duration::from_ticks(0))
    }

    fn start_measurement<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError> {
        bus.write_register(address, REG_CONFIG, &CONFIG_SINGLE_SHOT)?;
        Ok(CONVERSION_TIME)
    }

    fn read<B: BusAdapter>(&mut self, bus: &mut B, address: u8) -> Result<f32, SensorError> {
        let mut config = [0u8; 2];
        bus.read_register(address, REG_CONFIG, &mut config)?;
        if config[1] & CONFIG_CRF == 0 {
            return Err(SensorError::NotReady);
        }

        let mut raw = [0u8; 2];
        bus.read_register(address, REG_RESULT, &mut raw)?;
        Self::decode(u16::from_be_bytes(raw))
    }
}
