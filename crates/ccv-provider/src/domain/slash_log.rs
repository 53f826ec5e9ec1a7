//! # Slash Log
//!
//! Remembers which validators consumers have reported for double-signing
//! and which equivocations the provider has already punished, so replays
//! of the same evidence are no-ops.

use ccv_types::{ChainId, ConsAddress, Hash, Power, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Provider-verified double-sign evidence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equivocation {
    pub address: ConsAddress,
    /// Height of the conflicting votes on the chain where they were cast.
    pub height: i64,
    pub power: Power,
    pub time: Timestamp,
}

impl Equivocation {
    /// Evidence digest: SHA-256 over address, height, power and time.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.address.as_bytes());
        hasher.update(self.height.to_be_bytes());
        hasher.update(self.power.to_be_bytes());
        hasher.update(self.time.as_secs().to_be_bytes());
        hasher.finalize().into()
    }
}

/// Punishment applied for an equivocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashRecord {
    pub evidence_hash: Hash,
    pub slashed_at: Timestamp,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Entry {
    reported_by: BTreeSet<ChainId>,
    slashed: Option<SlashRecord>,
}

/// Per-validator double-sign history.
#[derive(Debug, Default)]
pub struct SlashLog {
    entries: BTreeMap<ConsAddress, Entry>,
}

impl SlashLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a consumer double-sign report. Returns false if this consumer
    /// had already reported the validator.
    pub fn record_report(&mut self, address: ConsAddress, chain_id: ChainId) -> bool {
        self.entries
            .entry(address)
            .or_default()
            .reported_by
            .insert(chain_id)
    }

    /// Whether any consumer reported the validator for double-signing.
    pub fn has_report(&self, address: &ConsAddress) -> bool {
        self.entries
            .get(address)
            .is_some_and(|e| !e.reported_by.is_empty())
    }

    pub fn reporters(&self, address: &ConsAddress) -> Vec<ChainId> {
        self.entries
            .get(address)
            .map(|e| e.reported_by.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn slash_record(&self, address: &ConsAddress) -> Option<&SlashRecord> {
        self.entries.get(address).and_then(|e| e.slashed.as_ref())
    }

    pub fn is_slashed(&self, address: &ConsAddress) -> bool {
        self.slash_record(address).is_some()
    }

    /// Record that the validator was slashed for `evidence`. Returns false
    /// (and leaves the log untouched) if it was already slashed.
    pub fn record_slash(&mut self, evidence: &Equivocation, now: Timestamp) -> bool {
        let entry = self.entries.entry(evidence.address).or_default();
        if entry.slashed.is_some() {
            return false;
        }
        entry.slashed = Some(SlashRecord {
            evidence_hash: evidence.hash(),
            slashed_at: now,
        });
        true
    }
}
