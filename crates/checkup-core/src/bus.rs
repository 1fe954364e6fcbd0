//! Bus transaction adapter
//!
//! Synchronous read/write primitives over the shared I2C bus. Every sensor
//! driver and probe task talks to its device through [`BusAdapter`]; any
//! `embedded_hal::i2c::I2c` implementation is an adapter. There are no
//! retries: a failed transaction is reported to the caller straight away.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use thiserror_no_std::Error;

/// Largest register payload accepted by [`BusAdapter::write_register`].
pub const MAX_REGISTER_PAYLOAD: usize = 15;

/// A failed bus transaction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("I2C transaction with device {device:#04x} failed: {kind:?}")]
pub struct BusError {
    pub device: u8,
    pub kind: ErrorKind,
}

impl BusError {
    pub const fn new(device: u8, kind: ErrorKind) -> Self {
        Self { device, kind }
    }
}

pub trait BusAdapter {
    fn write(&mut self, device: u8, bytes: &[u8]) -> Result<(), BusError>;

    fn read(&mut self, device: u8, buffer: &mut [u8]) -> Result<(), BusError>;

    fn write_read(&mut self, device: u8, bytes: &[u8], buffer: &mut [u8])
    -> Result<(), BusError>;

    /// Read `buffer.len()` bytes starting at an 8-bit register address.
    fn read_register(
        &mut self,
        device: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        self.write_read(device, &[register], buffer)
    }

    /// Write `data` starting at an 8-bit register address in one transaction.
    fn write_register(&mut self, device: u8, register: u8, data: &[u8]) -> Result<(), BusError> {
        if data.len() > MAX_REGISTER_PAYLOAD {
            return Err(BusError::new(device, ErrorKind::Overrun));
        }

        let mut frame = [0u8; MAX_REGISTER_PAYLOAD + 1];
        frame[0] = register;
        frame[1..=data.len()].copy_from_slice(data);
        self.write(device, &frame[..=data.len()])
    }
}

impl<I: I2c> BusAdapter for I {
    fn write(&mut self, device: u8, bytes: &[u8]) -> Result<(), BusError> {
        I2c::write(self, device, bytes).map_err(|e| BusError::new(device, e.kind()))
    }

    fn read(&mut self, device: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        I2c::read(self, device, buffer).map_err(|e| BusError::new(device, e.kind()))
    }

    fn write_read(
        &mut self,
        device: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        I2c::write_read(self, device, bytes, buffer).map_err(|e| BusError::new(device, e.kind()))
    }
}
