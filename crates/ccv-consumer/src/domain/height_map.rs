//! # Height → VSC Id Map
//!
//! Infractions are reported against the VSC that was in force at the
//! infraction height, so the provider can tell whether the validator set it
//! is punishing had already reached the consumer.

use ccv_types::VscId;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct HeightToVscMap {
    entries: BTreeMap<u64, VscId>,
}

impl HeightToVscMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, height: u64, vsc_id: VscId) {
        self.entries.insert(height, vsc_id);
    }

    /// VSC id for `height`: the entry at or below it. Heights older than
    /// anything retained, or before the first VSC, map to 0.
    pub fn vsc_for(&self, height: u64) -> VscId {
        self.entries
            .range(..=height)
            .next_back()
            .map(|(_, vsc_id)| *vsc_id)
            .unwrap_or(0)
    }

    /// Keep only the newest `keep` entries.
    pub fn prune(&mut self, keep: usize) {
        while self.entries.len() > keep {
            if self.entries.pop_first().is_none() {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
