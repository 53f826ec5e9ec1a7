//! # Soft Opt-Out
//!
//! Validators in the bottom `threshold` share of total power are exempt
//! from downtime jailing.
//!
//! Powers are summed in ascending order; the first validator whose
//! cumulative sum pushes `sum / total` above the threshold sets the
//! *smallest non-opt-out power*. Anything strictly below it opts out.
//!
//! ```text
//! threshold 0.05, powers [60, 500, 950] (total 1510)
//!   60 / 1510  = 0.039  ≤ 0.05
//!   560 / 1510 = 0.371  > 0.05  → smallest non-opt-out power = 500
//! ```

use crate::dec::Dec;
use crate::identifiers::Power;

/// Power of the smallest validator that may not opt out. Returns 0 (nobody
/// opts out) for an empty or powerless set.
pub fn smallest_non_opt_out_power(
    powers: impl IntoIterator<Item = Power>,
    threshold: Dec,
) -> Power {
    let mut sorted: Vec<Power> = powers.into_iter().filter(|p| *p > 0).collect();
    sorted.sort_unstable();
    let total: Power = sorted.iter().sum();
    if total <= 0 {
        return 0;
    }
    let mut sum: Power = 0;
    for power in &sorted {
        sum += power;
        if threshold.exceeded_by_ratio(sum, total) {
            return *power;
        }
    }
    // Only reachable with a threshold of 1 or more.
    sorted.last().copied().unwrap_or(0)
}

/// Whether a validator with `power` is exempt from downtime.
pub fn is_soft_opted_out(power: Power, smallest_non_opt_out: Power) -> bool {
    power < smallest_non_opt_out
}
