//! Sensor reading store
//!
//! One [`Channel`] per sensor kind, holding the latest value and its validity
//! flag. The store is owned by the application [`Resources`] and handed to
//! tasks by `&mut`; there is no global state and no locking. The only write
//! discipline is invalidate-then-validate: every completion first resets the
//! channel to "unknown" and only then stores a successful reading.
//!
//! [`Resources`]: crate::app::Resources

use core::fmt;

/// Value a channel holds when no successful reading is available.
pub trait Unknown: Copy {
    const UNKNOWN: Self;
}

impl Unknown for f32 {
    const UNKNOWN: Self = f32::NAN;
}

impl Unknown for u8 {
    const UNKNOWN: Self = 0xFF;
}

impl Unknown for () {
    const UNKNOWN: Self = ();
}

/// Three-axis acceleration in g.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Unknown for Acceleration {
    const UNKNOWN: Self = Self {
        x: f32::NAN,
        y: f32::NAN,
        z: f32::NAN,
    };
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2},{:.2},{:.2}]", self.x, self.y, self.z)
    }
}

/// Latest reading and validity of one sensor.
#[derive(Debug, Clone, Copy)]
pub struct Channel<T: Unknown> {
    value: T,
    valid: bool,
}

impl<T: Unknown> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Unknown> Channel<T> {
    pub const fn new() -> Self {
        Self {
            value: T::UNKNOWN,
            valid: false,
        }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Reset to "unknown". First step of every completion.
    pub fn invalidate(&mut self) {
        self.valid = false;
        self.value = T::UNKNOWN;
    }

    /// Store the outcome of one acquisition attempt.
    ///
    /// The channel is invalidated before the outcome is looked at, so a
    /// failed attempt can never leave the previous reading marked valid.
    pub fn record<E>(&mut self, outcome: Result<T, E>) -> bool {
        self.invalidate();
        if let Ok(value) = outcome {
            self.value = value;
            self.valid = true;
        }
        self.valid
    }
}

/// Identifies a channel for rendering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    Temperature,
    Acceleration,
    Humidity,
    Illuminance,
    Eeprom,
    Hall,
}

impl ChannelId {
    /// Every channel, in display order.
    pub const ALL: [ChannelId; 6] = [
        Self::Temperature,
        Self::Acceleration,
        Self::Humidity,
        Self::Illuminance,
        Self::Eeprom,
        Self::Hall,
    ];

    /// Part name shown on the display.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Temperature => "TMP112",
            Self::Acceleration => "LIS2DH12",
            Self::Humidity => "SHT30",
            Self::Illuminance => "OPT3001",
            Self::Eeprom => "M24C04",
            Self::Hall => "SI7210",
        }
    }

    /// Decimals of the displayed reading; `None` when nothing is printed.
    pub const fn decimals(self) -> Option<u8> {
        match self {
            Self::Temperature | Self::Acceleration | Self::Humidity => Some(1),
            Self::Illuminance => Some(0),
            Self::Eeprom | Self::Hall => None,
        }
    }
}

/// Snapshot of one channel as the render task sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStatus {
    pub id: ChannelId,
    pub valid: bool,
    /// Reading to print, already reduced to a scalar.
    pub reading: Option<f32>,
}

/// Latest state of every sensor channel.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    pub temperature: Channel<f32>,
    pub acceleration: Channel<Acceleration>,
    pub humidity: Channel<f32>,
    pub illuminance: Channel<f32>,
    pub eeprom: Channel<()>,
    pub hall: Channel<u8>,
}

impl ReadingStore {
    pub const fn new() -> Self {
        Self {
            temperature: Channel::new(),
            acceleration: Channel::new(),
            humidity: Channel::new(),
            illuminance: Channel::new(),
            eeprom: Channel::new(),
            hall: Channel::new(),
        }
    }

    pub fn is_valid(&self, id: ChannelId) -> bool {
        match id {
            ChannelId::Temperature => self.temperature.is_valid(),
            ChannelId::Acceleration => self.acceleration.is_valid(),
            ChannelId::Humidity => self.humidity.is_valid(),
            ChannelId::Illuminance => self.illuminance.is_valid(),
            ChannelId::Eeprom => self.eeprom.is_valid(),
            ChannelId::Hall => self.hall.is_valid(),
        }
    }

    pub fn status(&self, id: ChannelId) -> ChannelStatus {
        let reading = match id {
            ChannelId::Temperature => Some(self.temperature.value()),
            // Only the z axis fits on the status line.
            ChannelId::Acceleration => Some(self.acceleration.value().z),
            ChannelId::Humidity => Some(self.humidity.value()),
            ChannelId::Illuminance => Some(self.illuminance.value()),
            ChannelId::Eeprom | ChannelId::Hall => None,
        };

        ChannelStatus {
            id,
            valid: self.is_valid(id),
            reading,
        }
    }

    pub fn statuses(&self) -> impl Iterator<Item = ChannelStatus> + '_ {
        ChannelId::ALL.into_iter().map(|id| self.status(id))
    }
}
