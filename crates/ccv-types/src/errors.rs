//! # Error Types
//!
//! Errors shared by the provider, consumer and transport crates.

use thiserror::Error;

/// Packet / acknowledgement (de)serialization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Bytes could not be decoded into a known payload.
    #[error("Malformed payload: {0}")]
    Decode(String),

    /// Payload could not be serialized.
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Why a single parameter value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParam {
    #[error("value cannot be negative: {0}")]
    Negative(String),

    #[error("fraction must be at most 1, got {0}")]
    FractionAboveOne(String),

    #[error("{value} is outside [{min}, {max}]")]
    OutOfRange {
        value: String,
        min: String,
        max: String,
    },

    #[error("duration must be positive")]
    NonPositiveDuration,

    #[error("duration must be whole seconds of at least 1s, got {0:?}")]
    SubSecondDuration(std::time::Duration),

    #[error("integer must be positive, got {0}")]
    NonPositiveInteger(i64),

    #[error("invalid denom: {0:?}")]
    InvalidDenom(String),

    #[error("invalid channel id: {0:?}")]
    InvalidChannelId(String),

    #[error("invalid bech32 address: {0:?}")]
    InvalidAddress(String),
}

/// Parameter-set failures. Rejected parameters never reach the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    /// A field failed its validator.
    #[error("Invalid parameter {field}: {reason}")]
    InvalidField {
        /// Field name as it appears in the JSON form.
        field: &'static str,
        /// Validator verdict.
        reason: InvalidParam,
    },

    /// The JSON document itself could not be decoded.
    #[error("Cannot decode parameters: {0}")]
    Decode(String),
}

impl ParamsError {
    pub fn field(field: &'static str, reason: InvalidParam) -> Self {
        ParamsError::InvalidField { field, reason }
    }
}
