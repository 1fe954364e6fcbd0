//! Aggregated sensor health.

use crate::store::{ChannelId, ReadingStore};

/// How the per-channel validity flags combine into one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthPolicy {
    /// Healthy when every channel holds a valid reading.
    #[default]
    AllValid,
    /// Healthy when every channel except temperature is valid and temperature
    /// is *not*. Legacy verdict, only selected explicitly.
    InvertedTemperature,
}

impl HealthPolicy {
    pub fn assess(self, store: &ReadingStore) -> bool {
        ChannelId::ALL.into_iter().all(|id| {
            let valid = store.is_valid(id);
            match (self, id) {
                (HealthPolicy::InvertedTemperature, ChannelId::Temperature) => !valid,
                _ => valid,
            }
        })
    }
}
