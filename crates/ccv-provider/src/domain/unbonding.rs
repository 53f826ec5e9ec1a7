//! Unbonding operations waiting on VSC maturity.
//!
//! Each op is bound to the VSC id being built when it started and is
//! released once that VSC has matured on every consumer.

use ccv_types::VscId;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct UnbondingTracker {
    by_vsc: BTreeMap<VscId, Vec<u64>>,
}

impl UnbondingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, op_id: u64, vsc_id: VscId) {
        self.by_vsc.entry(vsc_id).or_default().push(op_id);
    }

    pub fn has_ops_for(&self, vsc_id: VscId) -> bool {
        self.by_vsc.get(&vsc_id).is_some_and(|ops| !ops.is_empty())
    }

    /// Remove and return ops whose VSC satisfies `matured`, in VSC order.
    pub fn take_released(&mut self, mut matured: impl FnMut(VscId) -> bool) -> Vec<u64> {
        let ready: Vec<VscId> = self.by_vsc.keys().copied().filter(|id| matured(*id)).collect();
        ready
            .into_iter()
            .filter_map(|id| self.by_vsc.remove(&id))
            .flatten()
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.by_vsc.values().map(Vec::len).sum()
    }
}
