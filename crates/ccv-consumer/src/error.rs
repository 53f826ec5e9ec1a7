//! Error types for the consumer.

use ccv_types::{ChannelId, CodecError, ConsAddress, ParamsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("CCV is not enabled on this consumer")]
    Disabled,

    #[error("Already connected to provider on {channel}")]
    AlreadyConnected { channel: ChannelId },

    #[error("Validator {address} is not in the consumer power table")]
    UnknownValidator { address: ConsAddress },

    #[error("Infraction height {height} is above the current height {current}")]
    FutureInfraction { height: u64, current: u64 },

    #[error("Params error: {0}")]
    Params(#[from] ParamsError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

pub type ConsumerResult<T> = Result<T, ConsumerError>;
