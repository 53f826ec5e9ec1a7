//! # Consumer Power Table
//!
//! The consumer's copy of the provider validator set. It only ever changes by
//! applying VSC packets, so it lags the provider by however long relaying
//! takes.

use ccv_types::{ConsAddress, Dec, Power, ValidatorPowerUpdate, smallest_non_opt_out_power};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerTable {
    powers: BTreeMap<ConsAddress, Power>,
}

impl PowerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_genesis(validators: &[(ConsAddress, Power)]) -> Self {
        let mut table = Self::new();
        for (address, power) in validators {
            table.set(*address, *power);
        }
        table
    }

    /// Apply updates in order. Power 0 removes the validator.
    pub fn apply(&mut self, updates: &[ValidatorPowerUpdate]) {
        for update in updates {
            self.set(update.address, update.power);
        }
    }

    fn set(&mut self, address: ConsAddress, power: Power) {
        if power <= 0 {
            self.powers.remove(&address);
        } else {
            self.powers.insert(address, power);
        }
    }

    /// Power of `address`, 0 if absent.
    pub fn power(&self, address: &ConsAddress) -> Power {
        self.powers.get(address).copied().unwrap_or(0)
    }

    pub fn contains(&self, address: &ConsAddress) -> bool {
        self.powers.contains_key(address)
    }

    pub fn total(&self) -> Power {
        self.powers.values().sum()
    }

    pub fn addresses(&self) -> Vec<ConsAddress> {
        self.powers.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConsAddress, &Power)> {
        self.powers.iter()
    }

    /// Smallest power that still has to answer for downtime.
    pub fn smallest_non_opt_out_power(&self, threshold: Dec) -> Power {
        smallest_non_opt_out_power(self.powers.values().copied(), threshold)
    }

    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }
}
