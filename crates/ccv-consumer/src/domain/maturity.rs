//! # Maturity Schedule
//!
//! Each applied VSC matures one consumer unbonding period after it was
//! applied. Matured ids are released in maturity-time order, ties by id.

use ccv_types::{Timestamp, VscId};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct MaturitySchedule {
    entries: BTreeSet<(Timestamp, VscId)>,
}

impl MaturitySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, vsc_id: VscId, matures_at: Timestamp) {
        self.entries.insert((matures_at, vsc_id));
    }

    /// Remove and return every VSC whose maturity time is at or before `now`.
    pub fn take_matured(&mut self, now: Timestamp) -> Vec<VscId> {
        let mut matured = Vec::new();
        while let Some(&(at, vsc_id)) = self.entries.first() {
            if at > now {
                break;
            }
            self.entries.remove(&(at, vsc_id));
            matured.push(vsc_id);
        }
        matured
    }

    pub fn matures_at(&self, vsc_id: VscId) -> Option<Timestamp> {
        self.entries
            .iter()
            .find(|(_, id)| *id == vsc_id)
            .map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
