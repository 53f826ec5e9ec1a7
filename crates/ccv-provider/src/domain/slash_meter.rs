//! # Slash Meter
//!
//! Bounds how much voting power consumer-initiated slash packets can jail
//! per unit of time.
//!
//! ```text
//! allowance = ceil(replenish_fraction × total_power)
//!
//!   meter ≥ 0  → dequeue and jail, meter -= jailed power (may go negative)
//!   meter < 0  → packets wait in the throttle queue
//!   now ≥ candidate → meter = min(meter + allowance, allowance)
//! ```
//!
//! The meter is also clamped to the allowance every block so that a drop in
//! total power never leaves it above the current allowance.

use ccv_types::{Dec, Power, Timestamp};
use std::time::Duration;

/// Power that may be jailed per replenish period.
pub fn slash_meter_allowance(fraction: Dec, total_power: Power) -> Power {
    fraction.mul_int_ceil(total_power.max(0))
}

/// Signed throttle meter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashMeter {
    value: Power,
    replenish_candidate: Timestamp,
}

impl SlashMeter {
    /// A full meter whose first replenishment is due one period after `now`.
    pub fn new(allowance: Power, now: Timestamp, period: Duration) -> Self {
        Self {
            value: allowance,
            replenish_candidate: now + period,
        }
    }

    pub fn value(&self) -> Power {
        self.value
    }

    /// Earliest block time at which the next replenishment happens.
    pub fn replenish_candidate(&self) -> Timestamp {
        self.replenish_candidate
    }

    /// Packets may be dequeued while the meter is non-negative.
    pub fn has_allowance(&self) -> bool {
        self.value >= 0
    }

    /// Replenish if due; returns whether a replenishment happened.
    pub fn replenish_if_due(&mut self, now: Timestamp, period: Duration, allowance: Power) -> bool {
        if now < self.replenish_candidate {
            return false;
        }
        self.value = self.value.saturating_add(allowance).min(allowance);
        self.replenish_candidate = now + period;
        true
    }

    /// Cap at the current allowance.
    pub fn clamp(&mut self, allowance: Power) {
        if self.value > allowance {
            self.value = allowance;
        }
    }

    pub fn consume(&mut self, power: Power) {
        self.value = self.value.saturating_sub(power);
    }
}
