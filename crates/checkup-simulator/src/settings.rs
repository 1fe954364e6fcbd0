//! Runtime configuration overrides.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory. Unset variables keep the core defaults.
//!
//! | Variable                      | Field             |
//! |-------------------------------|-------------------|
//! | `CHECKUP_SENSOR_INTERVAL_MS`  | `sensor_interval` |
//! | `CHECKUP_PROBE_INTERVAL_MS`   | `probe_interval`  |
//! | `CHECKUP_RENDER_INTERVAL_MS`  | `render_interval` |
//! | `CHECKUP_LED_PULSE_MS`        | `led_pulse`       |
//! | `CHECKUP_BOOT_PULSE_MS`       | `boot_pulse`      |
//! | `CHECKUP_BUTTON_SCAN_MS`      | `button_scan`     |
//! | `CHECKUP_HEALTH_POLICY`       | `health_policy` (`all-valid` or `inverted-temperature`) |

use std::env;

use checkup_core::AppConfig;
use checkup_core::health::HealthPolicy;
use embassy_time::Duration;
use log::{info, warn};

fn millis(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", name, raw, e);
            None
        }
    }
}

fn policy(name: &str) -> Option<HealthPolicy> {
    let raw = env::var(name).ok()?;
    match raw.trim() {
        "all-valid" => Some(HealthPolicy::AllValid),
        "inverted-temperature" => Some(HealthPolicy::InvertedTemperature),
        other => {
            warn!("Ignoring {}={:?}: unknown policy", name, other);
            None
        }
    }
}

/// Build the application configuration from defaults plus overrides.
pub fn load() -> AppConfig {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded overrides from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to read .env: {}", e),
    }

    let mut config = AppConfig::default();
    if let Some(d) = millis("CHECKUP_SENSOR_INTERVAL_MS") {
        config.sensor_interval = d;
    }
    if let Some(d) = millis("CHECKUP_PROBE_INTERVAL_MS") {
        config.probe_interval = d;
    }
    if let Some(d) = millis("CHECKUP_RENDER_INTERVAL_MS") {
        config.render_interval = d;
    }
    if let Some(d) = millis("CHECKUP_LED_PULSE_MS") {
        config.led_pulse = d;
    }
    if let Some(d) = millis("CHECKUP_BOOT_PULSE_MS") {
        config.boot_pulse = d;
    }
    if let Some(d) = millis("CHECKUP_BUTTON_SCAN_MS") {
        config.button_scan = d;
    }
    if let Some(p) = policy("CHECKUP_HEALTH_POLICY") {
        config.health_policy = p;
    }
    config
}
