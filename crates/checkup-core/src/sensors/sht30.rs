use embassy_time::Duration;
use sensirion_i2c::crc8;

use super::{SensorError, SensorKind};
use crate::bus::BusAdapter;

const CMD_SOFT_RESET: [u8; 2] = [0x30, 0xA2];
/// Single shot, high repeatability, clock stretching disabled.
const CMD_MEASURE_HIGH: [u8; 2] = [0x24, 0x00];

const RESET_TIME: Duration = Duration::from_millis(2);
const CONVERSION_TIME: Duration = Duration::from_millis(20);

/// SHT30 humidity sensor in single-shot mode. Only relative humidity is
/// reported; the temperature word is checksummed but otherwise ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sht30;

impl Sht30 {
    /// Validate both words of a measurement frame and convert the humidity
    /// word to percent.
    pub fn decode(frame: [u8; 6]) -> Result<f32, SensorError> {
        crc8::validate(&frame).map_err(|_| SensorError::Checksum)?;

        let raw = u16::from_be_bytes([frame[3], frame[4]]);
        Ok(100.0 * raw as f32 / 65535.0)
    }
}

impl SensorKind for Sht30 {
    type Value = f32;
    const NAME: &'static str = "SHT30";

    fn initialize<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError> {
        bus.write(address, &CMD_SOFT_RESET)?;
        Ok(RESET_TIME)
    }

    fn start_measurement<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError> {
        bus.write(address, &CMD_MEASURE_HIGH)?;
        Ok(CONVERSION_TIME)
    }

    fn read<B: BusAdapter>(&mut self, bus: &mut B, address: u8) -> Result<f32, SensorError> {
        let mut frame = [0u8; 6];
        bus.read(address, &mut frame)?;
        Self::decode(frame)
    }
}
