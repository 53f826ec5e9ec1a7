//! In-memory staking adapter
//!
//! Implements `StakingKeeper` over a token ledger. Power is tokens divided by
//! `power_reduction` (truncated), and 0 for jailed or unbonded validators.

use crate::error::StakingError;
use crate::ports::outbound::{StakingKeeper, ValidatorInfo};
use ccv_types::{ConsAddress, Dec, Power, Timestamp, ValidatorPowerUpdate};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Tokens per unit of consensus power.
pub const DEFAULT_POWER_REDUCTION: i64 = 1_000_000;

#[derive(Clone, Debug)]
struct ValidatorRecord {
    tokens: i64,
    jailed: bool,
    jailed_until: Timestamp,
    tombstoned: bool,
}

#[derive(Clone, Debug)]
struct UnbondingEntry {
    validator: ConsAddress,
    tokens: i64,
    completed: bool,
}

#[derive(Debug, Default)]
struct Ledger {
    validators: BTreeMap<ConsAddress, ValidatorRecord>,
    /// Power last reported through `take_validator_updates`.
    reported: BTreeMap<ConsAddress, Power>,
    unbondings: BTreeMap<u64, UnbondingEntry>,
    next_op_id: u64,
}

/// In-memory staking keeper for tests and simulations.
pub struct InMemoryStaking {
    ledger: RwLock<Ledger>,
    power_reduction: i64,
}

impl InMemoryStaking {
    pub fn new() -> Self {
        Self {
            ledger: RwLock::new(Ledger {
                next_op_id: 1,
                ..Ledger::default()
            }),
            power_reduction: DEFAULT_POWER_REDUCTION,
        }
    }

    /// Genesis set. These powers count as already reported, so they do not
    /// appear in the first `take_validator_updates`.
    pub fn with_validators(validators: &[(ConsAddress, Power)]) -> Self {
        let staking = Self::new();
        {
            let mut ledger = staking.ledger.write();
            for (address, power) in validators {
                ledger.validators.insert(
                    *address,
                    ValidatorRecord {
                        tokens: power.saturating_mul(staking.power_reduction),
                        jailed: false,
                        jailed_until: Timestamp::default(),
                        tombstoned: false,
                    },
                );
                ledger.reported.insert(*address, *power);
            }
        }
        staking
    }

    /// Bond tokens to a validator, creating it if needed.
    pub fn delegate(&self, address: ConsAddress, tokens: i64) {
        let mut ledger = self.ledger.write();
        let record = ledger
            .validators
            .entry(address)
            .or_insert_with(|| ValidatorRecord {
                tokens: 0,
                jailed: false,
                jailed_until: Timestamp::default(),
                tombstoned: false,
            });
        record.tokens = record.tokens.saturating_add(tokens);
        debug!("[ccv-staking] Delegated {} tokens to {}", tokens, address);
    }

    /// Start unbonding `tokens` from a validator. Returns the operation id.
    pub fn undelegate(&self, address: &ConsAddress, tokens: i64) -> Result<u64, StakingError> {
        let mut ledger = self.ledger.write();
        let record = ledger
            .validators
            .get_mut(address)
            .ok_or(StakingError::UnknownValidator { address: *address })?;
        if record.tokens < tokens {
            return Err(StakingError::InsufficientTokens {
                have: record.tokens,
                need: tokens,
            });
        }
        record.tokens -= tokens;
        let op_id = ledger.next_op_id;
        ledger.next_op_id += 1;
        ledger.unbondings.insert(
            op_id,
            UnbondingEntry {
                validator: *address,
                tokens,
                completed: false,
            },
        );
        debug!("[ccv-staking] Unbonding op {} started for {}", op_id, address);
        Ok(op_id)
    }

    pub fn is_unbonding_complete(&self, op_id: u64) -> bool {
        self.ledger
            .read()
            .unbondings
            .get(&op_id)
            .map(|u| u.completed)
            .unwrap_or(false)
    }

    pub fn tokens(&self, address: &ConsAddress) -> Option<i64> {
        self.ledger.read().validators.get(address).map(|v| v.tokens)
    }

    /// Current power of a validator (0 if unknown).
    pub fn power(&self, address: &ConsAddress) -> Power {
        let ledger = self.ledger.read();
        ledger
            .validators
            .get(address)
            .map(|r| self.power_of(r))
            .unwrap_or(0)
    }

    fn power_of(&self, record: &ValidatorRecord) -> Power {
        if record.jailed || record.tombstoned {
            0
        } else {
            record.tokens / self.power_reduction
        }
    }

    fn info(&self, address: &ConsAddress, record: &ValidatorRecord) -> ValidatorInfo {
        let power = self.power_of(record);
        ValidatorInfo {
            address: *address,
            power,
            jailed: record.jailed,
            jailed_until: record.jailed_until,
            tombstoned: record.tombstoned,
            bonded: power > 0,
        }
    }
}

impl Default for InMemoryStaking {
    fn default() -> Self {
        Self::new()
    }
}

impl StakingKeeper for InMemoryStaking {
    fn validator(&self, address: &ConsAddress) -> Option<ValidatorInfo> {
        let ledger = self.ledger.read();
        ledger
            .validators
            .get(address)
            .map(|record| self.info(address, record))
    }

    fn bonded_validators(&self) -> Vec<ValidatorInfo> {
        let ledger = self.ledger.read();
        ledger
            .validators
            .iter()
            .map(|(address, record)| self.info(address, record))
            .filter(|info| info.bonded)
            .collect()
    }

    fn total_power(&self) -> Power {
        let ledger = self.ledger.read();
        ledger
            .validators
            .values()
            .map(|record| self.power_of(record))
            .sum()
    }

    fn jail(&self, address: &ConsAddress, until: Timestamp) -> Result<(), StakingError> {
        let mut ledger = self.ledger.write();
        let record = ledger
            .validators
            .get_mut(address)
            .ok_or(StakingError::UnknownValidator { address: *address })?;
        record.jailed = true;
        record.jailed_until = record.jailed_until.max(until);
        info!("[ccv-staking] Jailed {} until {}", address, record.jailed_until);
        Ok(())
    }

    fn slash(&self, address: &ConsAddress, fraction: Dec) -> Result<i64, StakingError> {
        let mut ledger = self.ledger.write();
        let record = ledger
            .validators
            .get_mut(address)
            .ok_or(StakingError::UnknownValidator { address: *address })?;
        let burned = fraction.mul_int_trunc(record.tokens).clamp(0, record.tokens);
        record.tokens -= burned;
        info!(
            "[ccv-staking] Slashed {} by {} ({} tokens burned)",
            address, fraction, burned
        );
        Ok(burned)
    }

    fn tombstone(&self, address: &ConsAddress) -> Result<(), StakingError> {
        let mut ledger = self.ledger.write();
        let record = ledger
            .validators
            .get_mut(address)
            .ok_or(StakingError::UnknownValidator { address: *address })?;
        record.tombstoned = true;
        Ok(())
    }

    fn unjail(&self, address: &ConsAddress, now: Timestamp) -> Result<(), StakingError> {
        let mut ledger = self.ledger.write();
        let record = ledger
            .validators
            .get_mut(address)
            .ok_or(StakingError::UnknownValidator { address: *address })?;
        if record.tombstoned {
            return Err(StakingError::Tombstoned { address: *address });
        }
        if !record.jailed {
            return Err(StakingError::NotJailed { address: *address });
        }
        if now < record.jailed_until {
            return Err(StakingError::StillJailed {
                address: *address,
                until: record.jailed_until,
            });
        }
        record.jailed = false;
        info!("[ccv-staking] Unjailed {}", address);
        Ok(())
    }

    fn take_validator_updates(&self) -> Vec<ValidatorPowerUpdate> {
        let mut ledger = self.ledger.write();
        let current: Vec<(ConsAddress, Power)> = ledger
            .validators
            .iter()
            .map(|(address, record)| (*address, self.power_of(record)))
            .collect();

        let mut updates = Vec::new();
        for (address, power) in current {
            let previous = ledger.reported.get(&address).copied().unwrap_or(0);
            if previous != power {
                updates.push(ValidatorPowerUpdate::new(address, power));
                if power == 0 {
                    ledger.reported.remove(&address);
                } else {
                    ledger.reported.insert(address, power);
                }
            }
        }
        updates
    }

    fn unbonding_can_complete(&self, op_id: u64) -> Result<(), StakingError> {
        let mut ledger = self.ledger.write();
        let entry = ledger
            .unbondings
            .get_mut(&op_id)
            .ok_or(StakingError::UnknownUnbondingOp { op_id })?;
        entry.completed = true;
        debug!(
            "[ccv-staking] Unbonding op {} completed ({} tokens from {})",
            op_id, entry.tokens, entry.validator
        );
        Ok(())
    }
}
