use embassy_time::Duration;

use super::{SensorError, SensorKind};
use crate::bus::BusAdapter;
use crate::store::Acceleration;

const REG_WHO_AM_I: u8 = 0x0F;
const REG_CTRL1: u8 = 0x20;
const REG_CTRL4: u8 = 0x23;
const REG_STATUS: u8 = 0x27;
const REG_OUT_X_L: u8 = 0x28;
/// Register address auto-increment flag for multi-byte reads.
const AUTO_INCREMENT: u8 = 0x80;

const DEVICE_ID: u8 = 0x33;

/// Block data update, high-resolution mode, +-2 g.
const CTRL4_HIGH_RESOLUTION: u8 = 0x88;
/// Power down with all three axes enabled.
const CTRL1_POWER_DOWN: u8 = 0x07;
/// 100 Hz output data rate with all three axes enabled.
const CTRL1_100_HZ: u8 = 0x57;
/// New X, Y and Z data available.
const STATUS_ZYXDA: u8 = 0x08;

const CONVERSION_TIME: Duration = Duration::from_millis(80);
/// Sensitivity in high-resolution mode at +-2 g.
const G_PER_DIGIT: f32 = 0.001;

/// LIS2DH12 accelerometer, powered up only for the duration of a conversion.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lis2dh12;

impl Lis2dh12 {
    /// Convert the six output registers (X, Y, Z little-endian) to g.
    pub fn decode(raw: [u8; 6]) -> Acceleration {
        let axis = |lo: u8, hi: u8| (i16::from_le_bytes([lo, hi]) >> 4) as f32 * G_PER_DIGIT;

        Acceleration {
            x: axis(raw[0], raw[1]),
            y: axis(raw[2], raw[3]),
            z: axis(raw[4], raw[5]),
        }
    }
}

impl SensorKind for Lis2dh12 {
    type Value = Acceleration;
    const NAME: &'static str = "LIS2DH12";

    fn initialize<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError> {
        let mut id = [0u8; 1];
        bus.read_register(address, REG_WHO_AM_I, &mut id)?;
        if id[0] != DEVICE_ID {
            return Err(SensorError::UnexpectedDevice {
                expected: DEVICE_ID.into(),
                found: id[0].into(),
            });
        }

        bus.write_register(address, REG_CTRL4, &[CTRL4_HIGH_RESOLUTION])?;
        bus.write_register(address, REG_CTRL1, &[CTRL1_POWER_DOWN])?;
        Ok(Duration::from_ticks(0))
    }

    fn start_measurement<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Duration, SensorError> {
        bus.write_register(address, REG_CTRL1, &[CTRL1_100_HZ])?;
        Ok(CONVERSION_TIME)
    }

    fn read<B: BusAdapter>(
        &mut self,
        bus: &mut B,
        address: u8,
    ) -> Result<Acceleration, SensorError> {
        let mut status = [0u8; 1];
        bus.read_register(address, REG_STATUS, &mut status)?;
        if status[0] & STATUS_ZYXDA == 0 {
            return Err(SensorError::NotReady);
        }

        let mut raw = [0u8; 6];
        bus.read_register(address, REG_OUT_X_L | AUTO_INCREMENT, &mut raw)?;
        bus.write_register(address, REG_CTRL1, &[CTRL1_POWER_DOWN])?;

        Ok(Self::decode(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDRESS: u8 = 0x19;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_decode_twelve_bit_left_justified() {
        let g = Lis2dh12::decode([0x00, 0x00, 0xC0, 0xFE, 0x80, 0x3E]);

        assert!(close(g.x, 0.0));
        assert!(close(g.y, -0.02));
        assert!(close(g.z, 1.0));
    }

    #[test]
    fn test_initialize_checks_identity_and_configures() {
        let expectations = [
            I2cTransaction::write_read(ADDRESS, vec![0x0F], vec![0x33]),
            I2cTransaction::write(ADDRESS, vec![0x23, 0x88]),
            I2cTransaction::write(ADDRESS, vec![0x20, 0x07]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        Lis2dh12.initialize(&mut i2c, ADDRESS).unwrap();
        i2c.done();
    }

    #[test]
    fn test_initialize_rejects_foreign_device() {
        let expectations = [I2cTransaction::write_read(ADDRESS, vec![0x0F], vec![0x44])];
        let mut i2c = I2cMock::new(&expectations);

        assert_eq!(
            Lis2dh12.initialize(&mut i2c, ADDRESS),
            Err(SensorError::UnexpectedDevice {
                expected: 0x33,
                found: 0x44
            })
        );
        i2c.done();
    }

    #[test]
    fn test_read_fetches_axes_and_powers_down() {
        let expectations = [
            I2cTransaction::write_read(ADDRESS, vec![0x27], vec![0x0F]),
            I2cTransaction::write_read(
                ADDRESS,
                vec![0xA8],
                vec![0x00, 0x00, 0x00, 0x00, 0x80, 0x3E],
            ),
            I2cTransaction::write(ADDRESS, vec![0x20, 0x07]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let g = Lis2dh12.read(&mut i2c, ADDRESS).unwrap();

        assert!(close(g.z, 1.0));
        i2c.done();
    }

    #[test]
    fn test_read_without_new_data_is_not_ready() {
        let expectations = [I2cTransaction::write_read(ADDRESS, vec![0x27], vec![0x00])];
        let mut i2c = I2cMock::new(&expectations);

        assert_eq!(Lis2dh12.read(&mut i2c, ADDRESS), Err(SensorError::NotReady));
        i2c.done();
    }
}
