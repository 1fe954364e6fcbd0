//! Emulated I2C devices.
//!
//! [`SimBus`] implements `embedded_hal::i2c::I2c`, so the core drives it
//! through the same blanket adapter as a hardware bus. Each device keeps just
//! enough register state to answer the driver's protocol, with readings
//! generated from the wall clock. Any device can be faulted to NACK every
//! transaction.

use std::collections::BTreeSet;
use std::time::Instant;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::debug;
use sensirion_i2c::crc8;

/// One emulated bus device.
trait Device {
    fn address(&self) -> u8;

    fn write(&mut self, bytes: &[u8], t: f64);

    fn read(&mut self, buffer: &mut [u8], t: f64);
}

// ---------------------------------------------------------------------------
// TMP112
// ---------------------------------------------------------------------------

struct Tmp112 {
    pointer: u8,
    config: [u8; 2],
}

impl Device for Tmp112 {
    fn address(&self) -> u8 {
        0x48
    }

    fn write(&mut self, bytes: &[u8], _t: f64) {
        let Some((&pointer, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = pointer;
        if pointer == 0x01 && data.len() == 2 {
            // One-shot completes instantly: OS reads back set.
            self.config = [data[0], data[1]];
        }
    }

    fn read(&mut self, buffer: &mut [u8], t: f64) {
        let word = match self.pointer {
            0x00 => {
                let celsius = 23.0 + 2.0 * (t / 60.0).sin();
                (((celsius * 16.0) as i16) << 4).to_be_bytes()
            }
            0x01 => self.config,
            _ => [0xFF; 2],
        };
        copy(buffer, &word);
    }
}

// ---------------------------------------------------------------------------
// LIS2DH12
// ---------------------------------------------------------------------------

struct Lis2dh12 {
    pointer: u8,
    ctrl1: u8,
}

impl Lis2dh12 {
    fn register(&self, register: u8, t: f64) -> u8 {
        let axis = |g: f64| (((g * 1000.0) as i16) << 4).to_le_bytes();
        let x = axis(0.02 * (t / 3.0).sin());
        let y = axis(-0.01);
        let z = axis(0.98 + 0.01 * (t / 5.0).cos());

        match register {
            0x0F => 0x33,
            0x20 => self.ctrl1,
            // Data is ready whenever an output data rate is selected.
            0x27 if self.ctrl1 & 0xF0 != 0 => 0x0F,
            0x27 => 0x00,
            0x28 => x[0],
            0x29 => x[1],
            0x2A => y[0],
            0x2B => y[1],
            0x2C => z[0],
            0x2D => z[1],
            _ => 0x00,
        }
    }
}

impl Device for Lis2dh12 {
    fn address(&self) -> u8 {
        0x19
    }

    fn write(&mut self, bytes: &[u8], _t: f64) {
        let Some((&pointer, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = pointer;
        if pointer & 0x7F == 0x20 {
            if let Some(&value) = data.first() {
                self.ctrl1 = value;
            }
        }
    }

    fn read(&mut self, buffer: &mut [u8], t: f64) {
        let auto_increment = self.pointer & 0x80 != 0;
        let start = self.pointer & 0x7F;
        for (offset, byte) in buffer.iter_mut().enumerate() {
            let register = if auto_increment {
                start + offset as u8
            } else {
                start
            };
            *byte = self.register(register, t);
        }
    }
}

// ---------------------------------------------------------------------------
// SHT30
// ---------------------------------------------------------------------------

struct Sht30 {
    measured: bool,
}

impl Device for Sht30 {
    fn address(&self) -> u8 {
        0x45
    }

    fn write(&mut self, bytes: &[u8], _t: f64) {
        match bytes {
            [0x24, 0x00] => self.measured = true,
            [0x30, 0xA2] => self.measured = false,
            _ => {}
        }
    }

    fn read(&mut self, buffer: &mut [u8], t: f64) {
        if !self.measured {
            buffer.fill(0xFF);
            return;
        }

        let celsius = 23.0 + 2.0 * (t / 60.0).sin();
        let humidity = 45.0 + 8.0 * (t / 90.0).sin();
        let temperature = (((celsius + 45.0) / 175.0 * 65535.0) as u16).to_be_bytes();
        let humidity = ((humidity / 100.0 * 65535.0) as u16).to_be_bytes();

        let frame = [
            temperature[0],
            temperature[1],
            crc8::calculate(&temperature),
            humidity[0],
            humidity[1],
            crc8::calculate(&humidity),
        ];
        copy(buffer, &frame);
    }
}

// ---------------------------------------------------------------------------
// OPT3001
// ---------------------------------------------------------------------------

struct Opt3001 {
    pointer: u8,
    config: [u8; 2],
}

impl Opt3001 {
    fn result(t: f64) -> [u8; 2] {
        let lux = 320.0 + 120.0 * (t / 40.0).sin();
        let mut exponent = 0u16;
        let mut mantissa = lux / 0.01;
        while mantissa > 4095.0 && exponent < 11 {
            mantissa /= 2.0;
            exponent += 1;
        }
        ((exponent << 12) | mantissa as u16).to_be_bytes()
    }
}

impl Device for Opt3001 {
    fn address(&self) -> u8 {
        0x44
    }

    fn write(&mut self, bytes: &[u8], _t: f64) {
        let Some((&pointer, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = pointer;
        if pointer == 0x01 && data.len() == 2 {
            self.config = [data[0], data[1]];
            // Single-shot: conversion ready, back to shutdown.
            if data[0] & 0x06 == 0x02 {
                self.config = [data[0] & !0x06, data[1] | 0x80];
            }
        }
    }

    fn read(&mut self, buffer: &mut [u8], t: f64) {
        let word = match self.pointer {
            0x00 => {
                self.config[1] &= !0x80;
                Self::result(t)
            }
            0x01 => self.config,
            0x7F => [0x30, 0x01],
            _ => [0x00; 2],
        };
        copy(buffer, &word);
    }
}

// ---------------------------------------------------------------------------
// M24C04 and SI7210
// ---------------------------------------------------------------------------

struct M24c04 {
    pointer: u8,
    memory: [u8; 512],
}

impl Device for M24c04 {
    fn address(&self) -> u8 {
        0x51
    }

    fn write(&mut self, bytes: &[u8], _t: f64) {
        if let Some(&pointer) = bytes.first() {
            self.pointer = pointer;
        }
    }

    fn read(&mut self, buffer: &mut [u8], _t: f64) {
        let start = self.pointer as usize;
        for (offset, byte) in buffer.iter_mut().enumerate() {
            *byte = self.memory[(start + offset) % self.memory.len()];
        }
    }
}

struct Si7210 {
    pointer: u8,
}

impl Device for Si7210 {
    fn address(&self) -> u8 {
        0x32
    }

    fn write(&mut self, bytes: &[u8], _t: f64) {
        if let Some(&pointer) = bytes.first() {
            self.pointer = pointer;
        }
    }

    fn read(&mut self, buffer: &mut [u8], t: f64) {
        let value = match self.pointer {
            0xC0 => 0x14u8.wrapping_add(((t * 3.0).sin() * 4.0) as i8 as u8),
            _ => 0x00,
        };
        buffer.fill(value);
    }
}

fn copy(buffer: &mut [u8], data: &[u8]) {
    let len = buffer.len().min(data.len());
    buffer[..len].copy_from_slice(&data[..len]);
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// Emulated shared I2C bus with the six board devices attached.
pub struct SimBus {
    devices: Vec<Box<dyn Device>>,
    faults: BTreeSet<u8>,
    started: Instant,
}

impl SimBus {
    pub fn new() -> Self {
        let mut memory = [0u8; 512];
        for (i, byte) in memory.iter_mut().enumerate() {
            *byte = i as u8;
        }

        let devices: Vec<Box<dyn Device>> = vec![
            Box::new(Tmp112 {
                pointer: 0,
                config: [0x60, 0xA0],
            }),
            Box::new(Lis2dh12 {
                pointer: 0,
                ctrl1: 0x07,
            }),
            Box::new(Sht30 { measured: false }),
            Box::new(Opt3001 {
                pointer: 0,
                config: [0xC8, 0x10],
            }),
            Box::new(M24c04 { pointer: 0, memory }),
            Box::new(Si7210 { pointer: 0 }),
        ];

        Self {
            devices,
            faults: BTreeSet::new(),
            started: Instant::now(),
        }
    }

    /// Device addresses in board order, for fault key bindings.
    pub fn addresses(&self) -> Vec<u8> {
        self.devices.iter().map(|d| d.address()).collect()
    }

    /// Toggle the fault state of `address`. Returns `true` when now faulted.
    pub fn toggle_fault(&mut self, address: u8) -> bool {
        if self.faults.remove(&address) {
            false
        } else {
            self.faults.insert(address);
            true
        }
    }
}

impl ErrorType for SimBus {
    type Error = ErrorKind;
}

impl I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.faults.contains(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let t = self.started.elapsed().as_secs_f64();
        let Some(device) = self.devices.iter_mut().find(|d| d.address() == address) else {
            debug!("No device at {:#04x}", address);
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        };

        for operation in operations {
            match operation {
                Operation::Write(bytes) => device.write(bytes, t),
                Operation::Read(buffer) => device.read(buffer, t),
            }
        }
        Ok(())
    }
}
