//! Transport errors.

use ccv_types::{ChainId, ChannelId, Sequence};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Channel {channel} does not exist on {chain_id}")]
    UnknownChannel { chain_id: ChainId, channel: ChannelId },

    #[error("Channel {channel} on {chain_id} is closed")]
    ChannelClosed { chain_id: ChainId, channel: ChannelId },

    #[error("Cannot open a channel from {chain_id} to itself")]
    SelfChannel { chain_id: ChainId },

    /// Ack for a packet that was never received on this end.
    #[error("No receipt for packet {sequence} on {channel}")]
    NoReceipt { channel: ChannelId, sequence: Sequence },

    /// Ack or timeout for a packet without a live commitment.
    #[error("No commitment for packet {sequence} on {channel}")]
    NoCommitment { channel: ChannelId, sequence: Sequence },
}

pub type TransportResult<T> = Result<T, TransportError>;
