//! Consumer effects

use ccv_types::{ChannelId, ConsAddress, InfractionKind, Sequence, VscId};

/// Why a downtime report produced no packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DowntimeSkip {
    /// A previous downtime packet is still awaiting the provider's verdict.
    Outstanding,
    SoftOptOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsumerEffect {
    ProviderChannelEstablished {
        channel: ChannelId,
    },
    ProviderChannelClosed {
        channel: ChannelId,
    },
    VscApplied {
        vsc_id: VscId,
        updates: usize,
    },
    /// Re-delivered VSC, acknowledged without being applied again.
    VscIgnored {
        vsc_id: VscId,
    },
    /// A VSC reached its maturity time; the maturity packet is queued.
    VscMatured {
        vsc_id: VscId,
    },
    SlashPacketQueued {
        address: ConsAddress,
        infraction: InfractionKind,
        vsc_id: VscId,
    },
    DowntimeSkipped {
        address: ConsAddress,
        reason: DowntimeSkip,
    },
    /// Provider verdict on a slash packet.
    SlashAcknowledged {
        address: ConsAddress,
        jailed: bool,
    },
    SlashRejected {
        address: ConsAddress,
        reason: String,
    },
    OutstandingDowntimeCleared {
        address: ConsAddress,
    },
    /// A packet timed out and will be resent.
    PacketRequeued {
        kind: &'static str,
    },
    PacketRejected {
        sequence: Sequence,
        reason: String,
    },
}
