//! Provider effects
//!
//! Emitted alongside outbound messages by every dispatcher step so the host
//! chain (and tests) can observe what happened without inspecting state.

use ccv_types::{ChainId, ChannelId, ConsAddress, InfractionKind, Power, Sequence, Timestamp, VscId};

/// Why a consumer was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalReason {
    /// Stop proposal.
    Stopped,
    /// A VSC packet timed out in transport.
    PacketTimeout,
    /// A VSC stayed un-matured past `vsc_timeout_period`.
    VscTimeout,
    /// The channel closed underneath us.
    ChannelClosed,
    /// The consumer answered a VSC packet with an error ack.
    ErrorAck,
}

/// Why a slash request changed nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    UnknownValidator,
    NotBonded,
    Tombstoned,
    AlreadyJailed,
    SoftOptOut,
    AlreadySlashed,
}

/// Observable consequence of a provider step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEffect {
    ConsumerAdded {
        chain_id: ChainId,
    },
    ConsumerEstablished {
        chain_id: ChainId,
        channel: ChannelId,
        flushed: usize,
    },
    ConsumerRemoved {
        chain_id: ChainId,
        reason: RemovalReason,
    },
    /// VSC built for a consumer whose channel is not established yet.
    VscQueued {
        chain_id: ChainId,
        vsc_id: VscId,
    },
    VscSent {
        chain_id: ChainId,
        vsc_id: VscId,
        updates: usize,
    },
    VscMaturityAcked {
        chain_id: ChainId,
        vsc_id: VscId,
    },
    /// Every required consumer has acked.
    VscMatured {
        vsc_id: VscId,
    },
    /// Maturity ack parked behind a throttled slash packet.
    MaturityHeld {
        chain_id: ChainId,
        vsc_id: VscId,
    },
    SlashPacketQueued {
        chain_id: ChainId,
        address: ConsAddress,
        infraction: InfractionKind,
    },
    SlashPacketRejected {
        chain_id: Option<ChainId>,
        reason: String,
    },
    DuplicatePacket {
        chain_id: ChainId,
        sequence: Sequence,
    },
    ValidatorJailed {
        address: ConsAddress,
        until: Timestamp,
        power: Power,
        infraction: InfractionKind,
    },
    ValidatorSlashed {
        address: ConsAddress,
        infraction: InfractionKind,
        burned: i64,
    },
    ValidatorTombstoned {
        address: ConsAddress,
    },
    SlashSkipped {
        address: ConsAddress,
        reason: SkipReason,
    },
    UnbondingReleased {
        op_id: u64,
    },
    SlashMeterReplenished {
        value: Power,
    },
}
