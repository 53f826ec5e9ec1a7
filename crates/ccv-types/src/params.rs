//! # CCV Parameters
//!
//! Typed parameter sets for both sides of a CCV channel. Decimal fields are
//! decoded from strings (`"0.05"`), durations from whole seconds.
//!
//! Every field has a pure validator; `validate()` runs them in declaration
//! order and reports the first failure with the field name attached.
//!
//! | Provider field | Default |
//! |----------------|---------|
//! | `slash_meter_replenish_period` | 1h |
//! | `slash_meter_replenish_fraction` | 0.05 |
//! | `ccv_timeout_period` | 4 weeks |
//! | `vsc_timeout_period` | 5 weeks |
//! | `soft_opt_out_threshold` | 0.05 |
//! | `downtime_jail_duration` | 10 min |
//! | `slash_fraction_downtime` | 0.01 |
//! | `slash_fraction_double_sign` | 0.05 |

use crate::dec::Dec;
use crate::errors::{InvalidParam, ParamsError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Default CCV packet timeout (4 weeks).
pub const DEFAULT_CCV_TIMEOUT_PERIOD: Duration = Duration::from_secs(4 * WEEK);
/// Default VSC maturity timeout (5 weeks).
pub const DEFAULT_VSC_TIMEOUT_PERIOD: Duration = Duration::from_secs(5 * WEEK);
/// Staking module default unbonding time (21 days).
pub const DEFAULT_PROVIDER_UNBONDING_PERIOD: Duration = Duration::from_secs(21 * DAY);
/// Consumer unbonding period is one day shorter than the provider's.
pub const DEFAULT_CONSUMER_UNBONDING_PERIOD: Duration = Duration::from_secs(20 * DAY);
/// Default historical entries kept on the consumer.
pub const DEFAULT_HISTORICAL_ENTRIES: i64 = 10_000;
/// Default blocks between reward transmissions (about 2h of blocks).
pub const DEFAULT_BLOCKS_PER_DISTRIBUTION_TRANSMISSION: i64 = 1000;
/// Upper bound for the soft opt-out threshold.
pub const MAX_SOFT_OPT_OUT_THRESHOLD: Dec = Dec::from_parts(2, 1);

// =============================================================================
// PROVIDER
// =============================================================================

/// Provider-side parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderParams {
    /// Interval between slash meter replenishments.
    #[serde(with = "duration_secs")]
    pub slash_meter_replenish_period: Duration,

    /// Fraction of total power restored to the meter per period.
    pub slash_meter_replenish_fraction: Dec,

    /// Timeout attached to packets the provider sends.
    #[serde(with = "duration_secs")]
    pub ccv_timeout_period: Duration,

    /// How long a consumer may leave a VSC un-matured before removal.
    #[serde(with = "duration_secs")]
    pub vsc_timeout_period: Duration,

    /// Bottom share of power exempt from downtime jailing.
    pub soft_opt_out_threshold: Dec,

    #[serde(with = "duration_secs")]
    pub downtime_jail_duration: Duration,

    /// Applied only to provider-observed downtime.
    pub slash_fraction_downtime: Dec,

    /// Applied only to provider-verified equivocation.
    pub slash_fraction_double_sign: Dec,
}

impl Default for ProviderParams {
    fn default() -> Self {
        Self {
            slash_meter_replenish_period: Duration::from_secs(HOUR),
            slash_meter_replenish_fraction: Dec::from_parts(5, 2),
            ccv_timeout_period: DEFAULT_CCV_TIMEOUT_PERIOD,
            vsc_timeout_period: DEFAULT_VSC_TIMEOUT_PERIOD,
            soft_opt_out_threshold: Dec::from_parts(5, 2),
            downtime_jail_duration: Duration::from_secs(600),
            slash_fraction_downtime: Dec::from_parts(1, 2),
            slash_fraction_double_sign: Dec::from_parts(5, 2),
        }
    }
}

impl ProviderParams {
    /// Short periods for tests. Throttling is effectively off (fraction 1).
    pub fn for_testing() -> Self {
        Self {
            slash_meter_replenish_period: Duration::from_secs(20),
            slash_meter_replenish_fraction: Dec::ONE,
            ccv_timeout_period: Duration::from_secs(DAY),
            vsc_timeout_period: Duration::from_secs(2 * DAY),
            downtime_jail_duration: Duration::from_secs(60),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        validate_duration(self.slash_meter_replenish_period)
            .map_err(|e| ParamsError::field("slash_meter_replenish_period", e))?;
        validate_fraction(self.slash_meter_replenish_fraction)
            .map_err(|e| ParamsError::field("slash_meter_replenish_fraction", e))?;
        validate_duration(self.ccv_timeout_period)
            .map_err(|e| ParamsError::field("ccv_timeout_period", e))?;
        validate_duration(self.vsc_timeout_period)
            .map_err(|e| ParamsError::field("vsc_timeout_period", e))?;
        validate_soft_opt_out_threshold(self.soft_opt_out_threshold)
            .map_err(|e| ParamsError::field("soft_opt_out_threshold", e))?;
        validate_duration(self.downtime_jail_duration)
            .map_err(|e| ParamsError::field("downtime_jail_duration", e))?;
        validate_fraction(self.slash_fraction_downtime)
            .map_err(|e| ParamsError::field("slash_fraction_downtime", e))?;
        validate_fraction(self.slash_fraction_double_sign)
            .map_err(|e| ParamsError::field("slash_fraction_double_sign", e))?;
        Ok(())
    }

    /// Decode and validate in one step.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| ParamsError::Decode(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

// =============================================================================
// CONSUMER
// =============================================================================

/// Consumer-side parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerParams {
    /// Whether the consumer is running CCV (false before genesis handover).
    pub enabled: bool,

    pub blocks_per_distribution_transmission: i64,

    /// Existing transfer channel for rewards; empty means create one.
    pub distribution_transmission_channel: String,

    pub provider_fee_pool_addr_str: String,

    #[serde(with = "duration_secs")]
    pub ccv_timeout_period: Duration,

    #[serde(with = "duration_secs")]
    pub transfer_timeout_period: Duration,

    /// Share of rewards kept by the consumer.
    pub consumer_redistribution_fraction: Dec,

    /// Number of height → VSC id entries retained.
    pub historical_entries: i64,

    /// How long after applying a VSC before it matures.
    #[serde(with = "duration_secs")]
    pub unbonding_period: Duration,

    pub soft_opt_out_threshold: Dec,

    #[serde(default)]
    pub reward_denoms: Vec<String>,

    #[serde(default)]
    pub provider_reward_denoms: Vec<String>,

    /// Liveness window in blocks.
    pub signed_blocks_window: i64,

    /// Minimum share of the window a validator must sign.
    pub min_signed_per_window: Dec,
}

impl Default for ConsumerParams {
    fn default() -> Self {
        Self {
            enabled: false,
            blocks_per_distribution_transmission: DEFAULT_BLOCKS_PER_DISTRIBUTION_TRANSMISSION,
            distribution_transmission_channel: String::new(),
            provider_fee_pool_addr_str: String::new(),
            ccv_timeout_period: DEFAULT_CCV_TIMEOUT_PERIOD,
            transfer_timeout_period: Duration::from_secs(HOUR),
            consumer_redistribution_fraction: Dec::from_parts(75, 2),
            historical_entries: DEFAULT_HISTORICAL_ENTRIES,
            unbonding_period: DEFAULT_CONSUMER_UNBONDING_PERIOD,
            soft_opt_out_threshold: Dec::from_parts(5, 2),
            reward_denoms: Vec::new(),
            provider_reward_denoms: Vec::new(),
            signed_blocks_window: 100,
            min_signed_per_window: Dec::from_parts(5, 1),
        }
    }
}

impl ConsumerParams {
    /// Enabled, with a short unbonding period and a small liveness window.
    pub fn for_testing() -> Self {
        Self {
            enabled: true,
            ccv_timeout_period: Duration::from_secs(DAY),
            historical_entries: 100,
            unbonding_period: Duration::from_secs(600),
            signed_blocks_window: 10,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        validate_positive_i64(self.blocks_per_distribution_transmission)
            .map_err(|e| ParamsError::field("blocks_per_distribution_transmission", e))?;
        validate_channel_id(&self.distribution_transmission_channel)
            .map_err(|e| ParamsError::field("distribution_transmission_channel", e))?;
        if !self.provider_fee_pool_addr_str.is_empty() {
            validate_bech32_addr(&self.provider_fee_pool_addr_str)
                .map_err(|e| ParamsError::field("provider_fee_pool_addr_str", e))?;
        }
        validate_duration(self.ccv_timeout_period)
            .map_err(|e| ParamsError::field("ccv_timeout_period", e))?;
        validate_duration(self.transfer_timeout_period)
            .map_err(|e| ParamsError::field("transfer_timeout_period", e))?;
        validate_fraction(self.consumer_redistribution_fraction)
            .map_err(|e| ParamsError::field("consumer_redistribution_fraction", e))?;
        validate_positive_i64(self.historical_entries)
            .map_err(|e| ParamsError::field("historical_entries", e))?;
        validate_duration(self.unbonding_period)
            .map_err(|e| ParamsError::field("unbonding_period", e))?;
        validate_soft_opt_out_threshold(self.soft_opt_out_threshold)
            .map_err(|e| ParamsError::field("soft_opt_out_threshold", e))?;
        validate_denoms(&self.reward_denoms)
            .map_err(|e| ParamsError::field("reward_denoms", e))?;
        validate_denoms(&self.provider_reward_denoms)
            .map_err(|e| ParamsError::field("provider_reward_denoms", e))?;
        validate_positive_i64(self.signed_blocks_window)
            .map_err(|e| ParamsError::field("signed_blocks_window", e))?;
        validate_fraction(self.min_signed_per_window)
            .map_err(|e| ParamsError::field("min_signed_per_window", e))?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| ParamsError::Decode(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

// =============================================================================
// FIELD VALIDATORS
// =============================================================================

/// A fraction is a decimal in `[0, 1]`.
pub fn validate_fraction(value: Dec) -> Result<(), InvalidParam> {
    if value.is_negative() {
        return Err(InvalidParam::Negative(value.to_string()));
    }
    if value > Dec::ONE {
        return Err(InvalidParam::FractionAboveOne(value.to_string()));
    }
    Ok(())
}

/// Soft opt-out threshold must lie in `[0, 0.2]`.
pub fn validate_soft_opt_out_threshold(value: Dec) -> Result<(), InvalidParam> {
    if value.is_negative() {
        return Err(InvalidParam::Negative(value.to_string()));
    }
    if value > MAX_SOFT_OPT_OUT_THRESHOLD {
        return Err(InvalidParam::OutOfRange {
            value: value.to_string(),
            min: "0".into(),
            max: MAX_SOFT_OPT_OUT_THRESHOLD.to_string(),
        });
    }
    Ok(())
}

/// Block times are whole seconds, so anything shorter would never elapse.
pub fn validate_duration(value: Duration) -> Result<(), InvalidParam> {
    if value.is_zero() {
        return Err(InvalidParam::NonPositiveDuration);
    }
    if value < Duration::from_secs(1) {
        return Err(InvalidParam::SubSecondDuration(value));
    }
    Ok(())
}

pub fn validate_positive_i64(value: i64) -> Result<(), InvalidParam> {
    if value <= 0 {
        return Err(InvalidParam::NonPositiveInteger(value));
    }
    Ok(())
}

/// Each denom must match `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`.
pub fn validate_denoms(denoms: &[String]) -> Result<(), InvalidParam> {
    for denom in denoms {
        if !is_valid_denom(denom) {
            return Err(InvalidParam::InvalidDenom(denom.clone()));
        }
    }
    Ok(())
}

fn is_valid_denom(denom: &str) -> bool {
    let bytes = denom.as_bytes();
    if !(3..=128).contains(&bytes.len()) {
        return false;
    }
    if !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'))
}

/// Empty, or `channel-<n>`.
pub fn validate_channel_id(value: &str) -> Result<(), InvalidParam> {
    if value.is_empty() {
        return Ok(());
    }
    match value.strip_prefix("channel-") {
        Some(n) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => Ok(()),
        _ => Err(InvalidParam::InvalidChannelId(value.to_string())),
    }
}

const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Structural bech32 check: `<hrp>1<data>`, single case, data from the
/// bech32 alphabet with room for the 6-character checksum. The checksum
/// itself is not verified.
pub fn validate_bech32_addr(value: &str) -> Result<(), InvalidParam> {
    let invalid = || InvalidParam::InvalidAddress(value.to_string());
    if value.len() < 8 || value.len() > 90 {
        return Err(invalid());
    }
    let has_lower = value.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = value.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(invalid());
    }
    let lowered = value.to_ascii_lowercase();
    let (hrp, data) = lowered.rsplit_once('1').ok_or_else(invalid)?;
    if hrp.is_empty() || data.len() < 6 {
        return Err(invalid());
    }
    if !hrp.bytes().all(|b| (33..=126).contains(&b)) {
        return Err(invalid());
    }
    if !data.chars().all(|c| BECH32_CHARSET.contains(c)) {
        return Err(invalid());
    }
    Ok(())
}

/// Serde adapter storing a `Duration` as whole seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_params_are_valid() {
        assert!(ProviderParams::default().validate().is_ok());
        assert!(ConsumerParams::default().validate().is_ok());
        assert!(ProviderParams::for_testing().validate().is_ok());
        assert!(ConsumerParams::for_testing().validate().is_ok());
    }

    #[test]
    fn test_consumer_defaults_match_network_defaults() {
        let params = ConsumerParams::default();
        assert!(!params.enabled);
        assert_eq!(params.blocks_per_distribution_transmission, 1000);
        assert_eq!(params.unbonding_period, Duration::from_secs(20 * DAY));
        assert_eq!(params.consumer_redistribution_fraction.to_string(), "0.75");
        assert_eq!(params.historical_entries, 10_000);
    }

    #[test]
    fn test_fraction_bounds() {
        assert!(validate_fraction(dec("0")).is_ok());
        assert!(validate_fraction(dec("1")).is_ok());
        assert!(matches!(validate_fraction(dec("-0.1")), Err(InvalidParam::Negative(_))));
        assert!(matches!(
            validate_fraction(dec("1.01")),
            Err(InvalidParam::FractionAboveOne(_))
        ));
    }

    #[test]
    fn test_soft_opt_out_threshold_bounds() {
        assert!(validate_soft_opt_out_threshold(dec("0")).is_ok());
        assert!(validate_soft_opt_out_threshold(dec("0.2")).is_ok());
        assert!(validate_soft_opt_out_threshold(dec("0.21")).is_err());
        assert!(validate_soft_opt_out_threshold(dec("-0.01")).is_err());
    }

    #[test]
    fn test_duration_needs_a_whole_second() {
        assert_eq!(
            validate_duration(Duration::ZERO),
            Err(InvalidParam::NonPositiveDuration)
        );
        assert_eq!(
            validate_duration(Duration::from_millis(500)),
            Err(InvalidParam::SubSecondDuration(Duration::from_millis(500)))
        );
        assert!(validate_duration(Duration::from_secs(1)).is_ok());

        let params = ProviderParams {
            vsc_timeout_period: Duration::from_millis(999),
            ..ProviderParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_denoms() {
        let ok = vec!["stake".to_string(), "ibc/27394FB0".to_string()];
        assert!(validate_denoms(&ok).is_ok());
        assert!(validate_denoms(&["1abc".to_string()]).is_err());
        assert!(validate_denoms(&["ab".to_string()]).is_err());
        assert!(validate_denoms(&["bad denom".to_string()]).is_err());
    }

    #[test]
    fn test_channel_id() {
        assert!(validate_channel_id("").is_ok());
        assert!(validate_channel_id("channel-12").is_ok());
        assert!(validate_channel_id("channel-").is_err());
        assert!(validate_channel_id("chan-1").is_err());
    }

    #[test]
    fn test_bech32_shape() {
        assert!(validate_bech32_addr("cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu").is_ok());
        assert!(validate_bech32_addr("cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5bzv7xu").is_err());
        assert!(validate_bech32_addr("Cosmos1qypqxpq9qcrsszg2").is_err());
        assert!(validate_bech32_addr("noseparator").is_err());
    }

    #[test]
    fn test_validate_reports_field_name() {
        let params = ProviderParams {
            slash_meter_replenish_fraction: dec("1.5"),
            ..ProviderParams::default()
        };
        match params.validate() {
            Err(ParamsError::InvalidField { field, .. }) => {
                assert_eq!(field, "slash_meter_replenish_fraction")
            }
            other => panic!("unexpected {other:?}"),
        }

        let params = ConsumerParams {
            historical_entries: -1,
            ..ConsumerParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidField {
                field: "historical_entries",
                reason: InvalidParam::NonPositiveInteger(-1)
            })
        ));
    }

    #[test]
    fn test_from_json_decodes_strings_and_seconds() {
        let mut value = serde_json::to_value(ProviderParams::default()).unwrap();
        assert_eq!(value["slash_meter_replenish_fraction"], "0.05");
        assert_eq!(value["slash_meter_replenish_period"], 3600);

        value["soft_opt_out_threshold"] = "0.5".into();
        let err = ProviderParams::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ParamsError::InvalidField {
                field: "soft_opt_out_threshold",
                ..
            }
        ));

        value["soft_opt_out_threshold"] = "abc".into();
        assert!(matches!(
            ProviderParams::from_json(&value.to_string()),
            Err(ParamsError::Decode(_))
        ));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let params = ConsumerParams {
            unbonding_period: Duration::ZERO,
            ..ConsumerParams::default()
        };
        assert!(params.validate().is_err());
    }
}
