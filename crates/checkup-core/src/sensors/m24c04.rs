use embassy_time::Duration;

use super::{ChannelBinding, CompletionHandler, SensorContext, SensorError, SensorEvent};
use crate::bus::BusAdapter;
use crate::scheduler::{Task, TaskContext};
use crate::store::{Channel, ReadingStore};

const MEMORY_ADDRESS: u8 = 0x00;
const PROBE_LENGTH: usize = 16;

fn eeprom(store: &mut ReadingStore) -> &mut Channel<()> {
    &mut store.eeprom
}

/// Presence check of the M24C04 EEPROM: one 16-byte memory read per period.
pub struct EepromProbe {
    address: u8,
    period: Duration,
    binding: ChannelBinding<()>,
}

impl EepromProbe {
    pub fn new(address: u8, period: Duration) -> Self {
        Self {
            address,
            period,
            binding: ChannelBinding::new("M24C04", eeprom),
        }
    }

    fn probe<B: BusAdapter>(&self, bus: &mut B) -> Result<(), SensorError> {
        let mut buffer = [0u8; PROBE_LENGTH];
        bus.read_register(self.address, MEMORY_ADDRESS, &mut buffer)?;
        Ok(())
    }
}

impl<Ctx: SensorContext> Task<Ctx> for EepromProbe {
    fn run(&mut self, cx: &mut Ctx, sched: &mut TaskContext<'_>) {
        let (bus, store) = cx.bus_and_store();

        let event = match self.probe(bus) {
            Ok(()) => SensorEvent::Update(()),
            Err(error) => SensorEvent::Error(error),
        };
        self.binding.on_complete(store, event);

        sched.plan_current_from_now(self.period);
    }

    fn name(&self) -> &'static str {
        "M24C04"
    }
}
