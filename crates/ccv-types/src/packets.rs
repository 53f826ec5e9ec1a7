//! # CCV Packets
//!
//! Wire types exchanged over a CCV channel and their JSON codec.
//!
//! ```text
//! provider ──VscPacket──────────► consumer
//! provider ◄─VscMaturedPacket──── consumer
//! provider ◄─SlashPacket───────── consumer
//! provider ──Acknowledgement────► consumer   (for slash packets)
//! ```

use crate::errors::CodecError;
use crate::identifiers::{ChainId, ConsAddress, Power, Timestamp, VscId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// New power for one validator. Power 0 removes it from the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorPowerUpdate {
    pub address: ConsAddress,
    pub power: Power,
}

impl ValidatorPowerUpdate {
    pub fn new(address: ConsAddress, power: Power) -> Self {
        Self { address, power }
    }
}

/// Validator set change, provider → consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VscPacket {
    pub vsc_id: VscId,
    pub updates: Vec<ValidatorPowerUpdate>,
    /// Provider block time at which the packet was built.
    pub timestamp: Timestamp,
    /// Validators whose consumer-reported downtime has been handled.
    #[serde(default)]
    pub slash_acks: Vec<ConsAddress>,
}

/// Maturity notification, consumer → provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VscMaturedPacket {
    pub vsc_id: VscId,
}

/// Infraction category reported in a slash packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfractionKind {
    Downtime,
    DoubleSign,
}

impl fmt::Display for InfractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfractionKind::Downtime => f.write_str("downtime"),
            InfractionKind::DoubleSign => f.write_str("double-sign"),
        }
    }
}

/// Misbehavior report, consumer → provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashPacket {
    pub address: ConsAddress,
    /// VSC id in force at the infraction height; 0 means before the first VSC.
    pub vsc_id: VscId,
    pub infraction: InfractionKind,
    /// Power of the validator on the consumer at infraction time.
    pub power: Power,
    /// Set by the provider from the receiving channel; never trusted from the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
}

/// Every payload a CCV channel carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PacketData {
    Vsc(VscPacket),
    VscMatured(VscMaturedPacket),
    Slash(SlashPacket),
}

impl PacketData {
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PacketData::Vsc(_) => "vsc",
            PacketData::VscMatured(_) => "vsc_matured",
            PacketData::Slash(_) => "slash",
        }
    }
}

/// Successful acknowledgement payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckResult {
    /// Packet accepted; nothing further to report.
    Received,
    /// Slash packet executed. `jailed` is false when the report was a no-op
    /// (soft opt-out, already jailed, tombstoned or unknown validator).
    SlashHandled { jailed: bool },
}

/// Acknowledgement written by the receiver of a packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acknowledgement {
    Result(AckResult),
    Error(String),
}

impl Acknowledgement {
    pub fn received() -> Self {
        Acknowledgement::Result(AckResult::Received)
    }

    pub fn slash_handled(jailed: bool) -> Self {
        Acknowledgement::Result(AckResult::SlashHandled { jailed })
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Acknowledgement::Error(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Acknowledgement::Result(_))
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
