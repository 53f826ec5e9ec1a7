//! # Liveness Tracker
//!
//! Sliding window of signed / missed blocks per validator.
//!
//! ```text
//! window 10, min_signed 0.5
//!   min_signed_blocks = ceil(0.5 * 10) = 5
//!   max_missed        = 10 - 5        = 5
//!   6th miss inside the window → down
//! ```

use ccv_types::{ConsAddress, Dec};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Default, Clone)]
struct SigningRecord {
    /// `true` = missed, oldest first.
    window: VecDeque<bool>,
    missed: i64,
}

#[derive(Debug)]
pub struct LivenessTracker {
    window: usize,
    max_missed: i64,
    records: BTreeMap<ConsAddress, SigningRecord>,
}

impl LivenessTracker {
    pub fn new(signed_blocks_window: i64, min_signed_per_window: Dec) -> Self {
        let window = signed_blocks_window.max(1);
        let min_signed = min_signed_per_window.mul_int_ceil(window);
        Self {
            window: window as usize,
            max_missed: window - min_signed,
            records: BTreeMap::new(),
        }
    }

    pub fn max_missed(&self) -> i64 {
        self.max_missed
    }

    /// Record one block for `address`. Returns true once the validator has
    /// missed more blocks than the window allows.
    pub fn record(&mut self, address: ConsAddress, signed: bool) -> bool {
        let record = self.records.entry(address).or_default();
        record.window.push_back(!signed);
        if !signed {
            record.missed += 1;
        }
        if record.window.len() > self.window && record.window.pop_front() == Some(true) {
            record.missed -= 1;
        }
        record.missed > self.max_missed
    }

    pub fn missed(&self, address: &ConsAddress) -> i64 {
        self.records.get(address).map(|r| r.missed).unwrap_or(0)
    }

    /// Start the validator's window over, after it has been reported.
    pub fn reset(&mut self, address: &ConsAddress) {
        self.records.remove(address);
    }

    /// Drop validators that are no longer in the set.
    pub fn retain(&mut self, mut keep: impl FnMut(&ConsAddress) -> bool) {
        self.records.retain(|address, _| keep(address));
    }
}
