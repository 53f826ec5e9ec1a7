//! # Receipt Log
//!
//! Replay protection for packets received from consumers. Channels deliver
//! in order, so each consumer keeps a contiguous watermark plus the few
//! sequences received above it:
//!
//! ```text
//! received 1 2 3 _ 5      watermark = 3, above = {5}
//! receive 4               watermark = 5, above = {}
//! ```
//!
//! Memory stays bounded by the gap above the watermark, not by the number of
//! packets ever received.

use ccv_types::{ChainId, Sequence};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ChainReceipts {
    /// Every sequence up to and including this one has been received.
    watermark: Sequence,
    above: BTreeSet<Sequence>,
}

#[derive(Debug, Default)]
pub struct ReceiptLog {
    chains: BTreeMap<ChainId, ChainReceipts>,
}

impl ReceiptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a receipt. Returns false if `sequence` was already received.
    pub fn insert(&mut self, chain_id: &ChainId, sequence: Sequence) -> bool {
        let receipts = self.chains.entry(chain_id.clone()).or_default();
        if sequence <= receipts.watermark || !receipts.above.insert(sequence) {
            return false;
        }
        while receipts.above.remove(&(receipts.watermark + 1)) {
            receipts.watermark += 1;
        }
        true
    }

    pub fn contains(&self, chain_id: &ChainId, sequence: Sequence) -> bool {
        self.chains
            .get(chain_id)
            .is_some_and(|r| sequence <= r.watermark || r.above.contains(&sequence))
    }

    pub fn watermark(&self, chain_id: &ChainId) -> Sequence {
        self.chains.get(chain_id).map(|r| r.watermark).unwrap_or(0)
    }

    pub fn remove_consumer(&mut self, chain_id: &ChainId) {
        self.chains.remove(chain_id);
    }

    /// Sequences held individually above the watermarks.
    pub fn retained(&self) -> usize {
        self.chains.values().map(|r| r.above.len()).sum()
    }
}
