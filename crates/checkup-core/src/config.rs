//! Application configuration.
//!
//! Every value has a compile-time default matching the reference board. Hosts
//! (the simulator) may override fields before calling [`on_init`].
//!
//! [`on_init`]: crate::app::on_init

use embassy_time::Duration;

use crate::health::HealthPolicy;

/// I2C addresses of the sensors on the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorAddresses {
    pub tmp112: u8,
    pub lis2dh12: u8,
    pub sht30: u8,
    pub opt3001: u8,
    pub m24c04: u8,
    pub si7210: u8,
}

impl SensorAddresses {
    pub const fn new() -> Self {
        Self {
            tmp112: 0x48,
            lis2dh12: 0x19,
            sht30: 0x45,
            opt3001: 0x44,
            m24c04: 0x51,
            si7210: 0x32,
        }
    }
}

impl Default for SensorAddresses {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppConfig {
    /// Period of the four acquisition drivers.
    pub sensor_interval: Duration,
    /// Period of the EEPROM and hall probe tasks.
    pub probe_interval: Duration,
    pub render_interval: Duration,
    pub led_pulse: Duration,
    /// Board LED pulse shown once at boot.
    pub boot_pulse: Duration,
    pub button_scan: Duration,
    pub addresses: SensorAddresses,
    pub health_policy: HealthPolicy,
}

impl AppConfig {
    pub const fn new() -> Self {
        Self {
            sensor_interval: Duration::from_millis(1000),
            probe_interval: Duration::from_millis(1000),
            render_interval: Duration::from_millis(1000),
            led_pulse: Duration::from_millis(100),
            boot_pulse: Duration::from_millis(2000),
            button_scan: Duration::from_millis(20),
            addresses: SensorAddresses::new(),
            health_policy: HealthPolicy::AllValid,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
