//! # Jailing / Slashing Executor
//!
//! Applies the effect of an infraction on the provider's staking state.
//!
//! | Source | Downtime | Double sign |
//! |--------|----------|-------------|
//! | Consumer slash packet | jail for `downtime_jail_duration` | jail forever, log report |
//! | Provider slashing module | jail, burn downtime fraction | burn, tombstone, jail forever |
//!
//! Consumer-relayed reports never burn stake. Downtime from validators in the
//! soft opt-out range is ignored regardless of where it was observed.

use crate::domain::slash_log::{Equivocation, SlashLog};
use crate::error::ProviderResult;
use crate::events::{ProviderEffect, SkipReason};
use crate::ports::outbound::{StakingKeeper, ValidatorInfo};
use ccv_types::{
    is_soft_opted_out, smallest_non_opt_out_power, ChainId, ConsAddress, Dec, InfractionKind,
    Power, ProviderParams, SlashPacket, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, info};

/// What an execution did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlashOutcome {
    /// Validator jailed; carries the power removed from the active set.
    Jailed { power: Power },
    Skipped(SkipReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashExecution {
    pub address: ConsAddress,
    pub outcome: SlashOutcome,
    pub effects: Vec<ProviderEffect>,
}

impl SlashExecution {
    fn skipped(address: ConsAddress, reason: SkipReason) -> Self {
        Self {
            address,
            outcome: SlashOutcome::Skipped(reason),
            effects: vec![ProviderEffect::SlashSkipped { address, reason }],
        }
    }

    pub fn jailed(&self) -> bool {
        matches!(self.outcome, SlashOutcome::Jailed { .. })
    }

    /// Power to charge against the slash meter.
    pub fn jailed_power(&self) -> Power {
        match self.outcome {
            SlashOutcome::Jailed { power } => power,
            SlashOutcome::Skipped(_) => 0,
        }
    }
}

/// Executes infractions against a `StakingKeeper`.
pub struct SlashExecutor<S: StakingKeeper + ?Sized> {
    staking: Arc<S>,
}

impl<S: StakingKeeper + ?Sized> SlashExecutor<S> {
    pub fn new(staking: Arc<S>) -> Self {
        Self { staking }
    }

    /// Smallest power that cannot soft opt out under `threshold`.
    pub fn smallest_non_opt_out_power(&self, threshold: Dec) -> Power {
        smallest_non_opt_out_power(
            self.staking.bonded_validators().iter().map(|v| v.power),
            threshold,
        )
    }

    fn opted_out(&self, validator: &ValidatorInfo, threshold: Dec) -> bool {
        is_soft_opted_out(validator.power, self.smallest_non_opt_out_power(threshold))
    }

    /// Shared pre-checks; `Ok` means the validator can be jailed.
    fn precheck(
        &self,
        address: &ConsAddress,
        infraction: InfractionKind,
        threshold: Dec,
    ) -> Result<ValidatorInfo, SkipReason> {
        let validator = self
            .staking
            .validator(address)
            .ok_or(SkipReason::UnknownValidator)?;
        if validator.tombstoned {
            return Err(SkipReason::Tombstoned);
        }
        if validator.jailed {
            return Err(SkipReason::AlreadyJailed);
        }
        if !validator.bonded {
            return Err(SkipReason::NotBonded);
        }
        if infraction == InfractionKind::Downtime && self.opted_out(&validator, threshold) {
            return Err(SkipReason::SoftOptOut);
        }
        Ok(validator)
    }

    /// Handle a slash packet relayed by `chain_id`. Never slashes.
    pub fn execute_consumer_slash(
        &self,
        packet: &SlashPacket,
        chain_id: &ChainId,
        params: &ProviderParams,
        slash_log: &mut SlashLog,
        now: Timestamp,
    ) -> ProviderResult<SlashExecution> {
        let address = packet.address;
        if packet.infraction == InfractionKind::DoubleSign {
            slash_log.record_report(address, chain_id.clone());
        }

        let threshold = params.soft_opt_out_threshold;
        let validator = match self.precheck(&address, packet.infraction, threshold) {
            Ok(validator) => validator,
            Err(SkipReason::AlreadyJailed) if packet.infraction == InfractionKind::DoubleSign => {
                // Keep it jailed until governance acts on the slash log.
                self.staking.jail(&address, Timestamp::MAX)?;
                return Ok(SlashExecution::skipped(address, SkipReason::AlreadyJailed));
            }
            Err(reason) => {
                debug!(
                    "[ccv-provider] {} report from {} for {} skipped: {:?}",
                    packet.infraction, chain_id, address, reason
                );
                return Ok(SlashExecution::skipped(address, reason));
            }
        };

        let until = match packet.infraction {
            InfractionKind::Downtime => now + params.downtime_jail_duration,
            InfractionKind::DoubleSign => Timestamp::MAX,
        };
        self.staking.jail(&address, until)?;
        info!(
            "[ccv-provider] Jailed {} (power {}) for {} reported by {}",
            address, validator.power, packet.infraction, chain_id
        );

        Ok(SlashExecution {
            address,
            outcome: SlashOutcome::Jailed {
                power: validator.power,
            },
            effects: vec![ProviderEffect::ValidatorJailed {
                address,
                until,
                power: validator.power,
                infraction: packet.infraction,
            }],
        })
    }

    /// Downtime observed by the provider's own slashing module.
    pub fn execute_local_downtime(
        &self,
        address: &ConsAddress,
        params: &ProviderParams,
        now: Timestamp,
    ) -> ProviderResult<SlashExecution> {
        let threshold = params.soft_opt_out_threshold;
        let validator = match self.precheck(address, InfractionKind::Downtime, threshold) {
            Ok(validator) => validator,
            Err(reason) => return Ok(SlashExecution::skipped(*address, reason)),
        };

        let until = now + params.downtime_jail_duration;
        self.staking.jail(address, until)?;
        let burned = self.staking.slash(address, params.slash_fraction_downtime)?;
        info!(
            "[ccv-provider] Provider downtime: jailed {} until {}, burned {}",
            address, until, burned
        );

        Ok(SlashExecution {
            address: *address,
            outcome: SlashOutcome::Jailed {
                power: validator.power,
            },
            effects: vec![
                ProviderEffect::ValidatorJailed {
                    address: *address,
                    until,
                    power: validator.power,
                    infraction: InfractionKind::Downtime,
                },
                ProviderEffect::ValidatorSlashed {
                    address: *address,
                    infraction: InfractionKind::Downtime,
                    burned,
                },
            ],
        })
    }

    /// Provider-verified equivocation: slash, tombstone, jail forever. A
    /// validator is punished at most once however often the evidence replays.
    pub fn execute_equivocation(
        &self,
        evidence: &Equivocation,
        params: &ProviderParams,
        slash_log: &mut SlashLog,
        now: Timestamp,
    ) -> ProviderResult<SlashExecution> {
        let address = evidence.address;
        let Some(validator) = self.staking.validator(&address) else {
            return Ok(SlashExecution::skipped(address, SkipReason::UnknownValidator));
        };
        if validator.tombstoned || slash_log.is_slashed(&address) {
            return Ok(SlashExecution::skipped(address, SkipReason::AlreadySlashed));
        }

        let burned = self
            .staking
            .slash(&address, params.slash_fraction_double_sign)?;
        self.staking.jail(&address, Timestamp::MAX)?;
        self.staking.tombstone(&address)?;
        slash_log.record_slash(evidence, now);
        info!(
            "[ccv-provider] Equivocation at height {}: slashed {} ({} burned), tombstoned",
            evidence.height, address, burned
        );

        let mut effects = Vec::with_capacity(3);
        if !validator.jailed {
            effects.push(ProviderEffect::ValidatorJailed {
                address,
                until: Timestamp::MAX,
                power: validator.power,
                infraction: InfractionKind::DoubleSign,
            });
        }
        effects.push(ProviderEffect::ValidatorSlashed {
            address,
            infraction: InfractionKind::DoubleSign,
            burned,
        });
        effects.push(ProviderEffect::ValidatorTombstoned { address });

        Ok(SlashExecution {
            address,
            outcome: if validator.jailed {
                SlashOutcome::Skipped(SkipReason::AlreadyJailed)
            } else {
                SlashOutcome::Jailed {
                    power: validator.power,
                }
            },
            effects,
        })
    }
}
