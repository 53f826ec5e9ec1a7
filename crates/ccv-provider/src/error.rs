//! Error types for the CCV provider

use ccv_types::{ChainId, ChannelId, CodecError, ConsAddress, ParamsError, Timestamp};
use thiserror::Error;

/// Failures reported by the staking collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakingError {
    /// No validator with this consensus address.
    #[error("Unknown validator: {address}")]
    UnknownValidator { address: ConsAddress },

    /// Unjail requested for a validator that is not jailed.
    #[error("Validator {address} is not jailed")]
    NotJailed { address: ConsAddress },

    /// Jail period has not elapsed.
    #[error("Validator {address} jailed until {until}")]
    StillJailed {
        address: ConsAddress,
        until: Timestamp,
    },

    /// Tombstoned validators can never unjail.
    #[error("Validator {address} is tombstoned")]
    Tombstoned { address: ConsAddress },

    /// No unbonding operation with this id.
    #[error("Unknown unbonding operation: {op_id}")]
    UnknownUnbondingOp { op_id: u64 },

    /// Not enough delegated tokens for the request.
    #[error("Insufficient tokens: have {have}, need {need}")]
    InsufficientTokens { have: i64, need: i64 },
}

/// CCV provider errors. Packet-level problems never show up here; they
/// become error acknowledgements.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Chain id is not a registered consumer.
    #[error("Unknown consumer chain: {chain_id}")]
    UnknownConsumer { chain_id: ChainId },

    /// Chain id already registered.
    #[error("Consumer chain already registered: {chain_id}")]
    DuplicateConsumer { chain_id: ChainId },

    /// Channel is already bound to another consumer.
    #[error("Channel {channel} already bound to {chain_id}")]
    ChannelInUse {
        channel: ChannelId,
        chain_id: ChainId,
    },

    /// Consumer already has an established channel.
    #[error("Consumer {chain_id} already established on {channel}")]
    AlreadyEstablished {
        chain_id: ChainId,
        channel: ChannelId,
    },

    /// Consumer addition proposal failed validation.
    #[error("Invalid consumer addition: {reason}")]
    InvalidConsumerAddition { reason: String },

    /// Equivocation proposal for a validator no consumer has reported.
    #[error("No slash log for validator {address}")]
    NoSlashLog { address: ConsAddress },

    /// Equivocation proposal without evidence.
    #[error("Equivocation proposal contains no evidence")]
    EmptyProposal,

    /// Staking collaborator refused the operation.
    #[error("Staking error: {0}")]
    Staking(#[from] StakingError),

    /// Parameters rejected at set time.
    #[error("Invalid parameters: {0}")]
    Params(#[from] ParamsError),

    /// Outbound packet could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
