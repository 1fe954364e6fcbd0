use embassy_time::Duration;

use super::{ChannelBinding, CompletionHandler, SensorContext, SensorError, SensorEvent};
use crate::bus::BusAdapter;
use crate::scheduler::{Task, TaskContext};
use crate::store::{Channel, ReadingStore};

const REG_PROBE: u8 = 0xC0;

fn hall(store: &mut ReadingStore) -> &mut Channel<u8> {
    &mut store.hall
}

/// Reachability check of the SI7210 hall sensor: one register read per
/// period, keeping the raw byte.
pub struct HallProbe {
    address: u8,
    period: Duration,
    binding: ChannelBinding<u8>,
}

impl HallProbe {
    pub fn new(address: u8, period: Duration) -> Self {
        Self {
            address,
            period,
            binding: ChannelBinding::new("SI7210", hall),
        }
    }

    fn probe<B: BusAdapter>(&self, bus: &mut B) -> Result<u8, SensorError> {
        let mut data = [0xFF];
        bus.read_register(self.address, REG_PROBE, &mut data)?;
        Ok(data[0])
    }
}

impl<Ctx: SensorContext> Task<Ctx> for HallProbe {
    fn run(&mut self, cx: &mut Ctx, sched: &mut TaskContext<'_>) {
        let (bus, store) = cx.bus_and_store();

        let event = match self.probe(bus) {
            Ok(data) => SensorEvent::Update(data),
            Err(error) => SensorEvent::Error(error),
        };
        self.binding.on_complete(store, event);

        sched.plan_current_from_now(self.period);
    }

    fn name(&self) -> &'static str {
        "SI7210"
    }
}
