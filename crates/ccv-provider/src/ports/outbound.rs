//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The provider never owns stake. Bonding, power and jail state live behind
//! `StakingKeeper`; the provider only asks for effects on it.

use crate::error::StakingError;
use ccv_types::{ConsAddress, Dec, Power, Timestamp, ValidatorPowerUpdate};

/// Provider-side view of one validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorInfo {
    pub address: ConsAddress,
    /// Consensus power; 0 while jailed or unbonded.
    pub power: Power,
    pub jailed: bool,
    pub jailed_until: Timestamp,
    pub tombstoned: bool,
    /// Whether the validator is in the bonded (active) set.
    pub bonded: bool,
}

/// Staking, slashing and jailing collaborator.
///
/// Methods take `&self`; implementations provide their own interior
/// mutability so a single instance can be shared with the host chain.
pub trait StakingKeeper: Send + Sync {
    /// Look up a validator by consensus address.
    fn validator(&self, address: &ConsAddress) -> Option<ValidatorInfo>;

    /// All validators currently in the bonded set.
    fn bonded_validators(&self) -> Vec<ValidatorInfo>;

    /// Sum of bonded power.
    fn total_power(&self) -> Power;

    /// Jail until `until`. Re-jailing an already jailed validator only
    /// extends the jail period.
    fn jail(&self, address: &ConsAddress, until: Timestamp) -> Result<(), StakingError>;

    /// Burn `fraction` of the validator's tokens. Returns the burned amount.
    fn slash(&self, address: &ConsAddress, fraction: Dec) -> Result<i64, StakingError>;

    /// Mark the validator as permanently barred from unjailing.
    fn tombstone(&self, address: &ConsAddress) -> Result<(), StakingError>;

    /// Release from jail once `now` has passed the jail period.
    fn unjail(&self, address: &ConsAddress, now: Timestamp) -> Result<(), StakingError>;

    /// Power changes since the previous call.
    fn take_validator_updates(&self) -> Vec<ValidatorPowerUpdate>;

    /// Allow an unbonding operation to finish.
    fn unbonding_can_complete(&self, op_id: u64) -> Result<(), StakingError>;
}
