//! # Maturity Tracker
//!
//! One record per VSC id: which consumers must acknowledge maturity, which
//! already have, and when the last required ack arrived.
//!
//! ```text
//! open(vsc, {a, b})  ──ack(a)──►  {b} outstanding  ──ack(b)──►  matured_at = now
//!                         └──remove_consumer(b)───────────────►  matured_at = now
//! ```
//!
//! A record with nobody to wait for (no consumers registered) matures as
//! soon as it is opened. Send times are stamped per consumer when the packet
//! actually leaves on a channel, so a consumer still waiting for its channel
//! never has an outstanding VSC for timeout purposes.

use ccv_types::{ChainId, Timestamp, VscId};
use std::collections::{BTreeMap, BTreeSet};

/// Maturity state of one VSC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaturityRecord {
    pub vsc_id: VscId,
    /// Provider block time when the VSC was built.
    pub built_at: Timestamp,
    /// When the packet went out to each consumer.
    pub sent_at: BTreeMap<ChainId, Timestamp>,
    pub required: BTreeSet<ChainId>,
    pub acked: BTreeSet<ChainId>,
    pub matured_at: Option<Timestamp>,
}

impl MaturityRecord {
    fn outstanding(&self) -> impl Iterator<Item = &ChainId> {
        self.required.difference(&self.acked)
    }

    fn settle(&mut self, now: Timestamp) -> bool {
        if self.matured_at.is_none() && self.outstanding().next().is_none() {
            self.matured_at = Some(now);
            return true;
        }
        false
    }
}

/// Result of recording one maturity ack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckOutcome {
    /// No record for this VSC id.
    UnknownVsc,
    /// Consumer was not required to ack this VSC (or already did).
    Ignored,
    /// Ack recorded; other consumers still outstanding.
    Recorded,
    /// Ack recorded and the VSC is now fully matured.
    Matured,
}

#[derive(Debug, Default)]
pub struct MaturityTracker {
    records: BTreeMap<VscId, MaturityRecord>,
}

impl MaturityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `vsc_id`. Re-opening an existing id is ignored.
    pub fn open(&mut self, vsc_id: VscId, required: BTreeSet<ChainId>, now: Timestamp) {
        if self.records.contains_key(&vsc_id) {
            return;
        }
        let mut record = MaturityRecord {
            vsc_id,
            built_at: now,
            sent_at: BTreeMap::new(),
            required,
            acked: BTreeSet::new(),
            matured_at: None,
        };
        record.settle(now);
        self.records.insert(vsc_id, record);
    }

    /// Stamp the time the VSC was sent to `chain_id`. Only the first send counts.
    pub fn mark_sent(&mut self, vsc_id: VscId, chain_id: &ChainId, now: Timestamp) {
        if let Some(record) = self.records.get_mut(&vsc_id) {
            if record.required.contains(chain_id) {
                record.sent_at.entry(chain_id.clone()).or_insert(now);
            }
        }
    }

    pub fn record_ack(&mut self, vsc_id: VscId, chain_id: &ChainId, now: Timestamp) -> AckOutcome {
        let Some(record) = self.records.get_mut(&vsc_id) else {
            return AckOutcome::UnknownVsc;
        };
        if !record.required.contains(chain_id) || record.acked.contains(chain_id) {
            return AckOutcome::Ignored;
        }
        record.acked.insert(chain_id.clone());
        if record.settle(now) {
            AckOutcome::Matured
        } else {
            AckOutcome::Recorded
        }
    }

    /// Drop a consumer's obligations. Returns the VSC ids that matured as a result.
    pub fn remove_consumer(&mut self, chain_id: &ChainId, now: Timestamp) -> Vec<VscId> {
        let mut matured = Vec::new();
        for record in self.records.values_mut() {
            if record.required.remove(chain_id) {
                record.acked.remove(chain_id);
                record.sent_at.remove(chain_id);
                if record.settle(now) {
                    matured.push(record.vsc_id);
                }
            }
        }
        matured
    }

    /// True when every consumer that had to ack `vsc_id` has done so. Ids
    /// that were never tracked have nobody to wait for.
    pub fn all_consumers_acked(&self, vsc_id: VscId) -> bool {
        self.records
            .get(&vsc_id)
            .map(|r| r.outstanding().next().is_none())
            .unwrap_or(true)
    }

    /// Block time at which `vsc_id` fully matured, if it has.
    pub fn maturity_time(&self, vsc_id: VscId) -> Option<Timestamp> {
        self.records.get(&vsc_id).and_then(|r| r.matured_at)
    }

    /// Matured at or before `now`.
    pub fn is_matured(&self, vsc_id: VscId, now: Timestamp) -> bool {
        self.maturity_time(vsc_id).is_some_and(|t| t <= now)
    }

    /// Oldest VSC sent to this consumer and still awaiting its ack. VSCs
    /// queued for a consumer without a channel are not counted.
    pub fn oldest_outstanding(&self, chain_id: &ChainId) -> Option<(VscId, Timestamp)> {
        self.records
            .values()
            .filter(|r| !r.acked.contains(chain_id))
            .filter_map(|r| r.sent_at.get(chain_id).map(|sent| (r.vsc_id, *sent)))
            .min_by_key(|(vsc_id, sent)| (*sent, *vsc_id))
    }

    pub fn record(&self, vsc_id: VscId) -> Option<&MaturityRecord> {
        self.records.get(&vsc_id)
    }

    /// Forget matured records with id below `vsc_id`. Unmatured records are
    /// kept whatever their id.
    pub fn prune_matured_before(&mut self, vsc_id: VscId) -> usize {
        let before = self.records.len();
        self.records
            .retain(|id, r| *id >= vsc_id || r.matured_at.is_none());
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
