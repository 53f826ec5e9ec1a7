//! # Dispatcher Messages
//!
//! The provider and consumer state machines never talk to a transport
//! directly. Each block they consume `InboundMessage`s and return a
//! `Dispatch` listing what should be written back out.
//!
//! ```text
//! (state, InboundMessage) ──► (state', Dispatch { outbound, effects })
//! ```

use crate::identifiers::{ChannelId, Timestamp};
use crate::packets::Acknowledgement;
use serde::{Deserialize, Serialize};

/// Channel packet sequence number.
pub type Sequence = u64;

/// Something the transport delivered to this chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundMessage {
    /// A packet arrived on `channel`.
    Recv {
        channel: ChannelId,
        sequence: Sequence,
        data: Vec<u8>,
    },
    /// The counterparty acknowledged a packet this chain sent.
    Acknowledgement {
        channel: ChannelId,
        sequence: Sequence,
        data: Vec<u8>,
        ack: Acknowledgement,
    },
    /// A packet this chain sent was not received before its timeout.
    Timeout {
        channel: ChannelId,
        sequence: Sequence,
        data: Vec<u8>,
    },
    /// The channel was closed by the counterparty or the transport.
    ChannelClosed { channel: ChannelId },
}

impl InboundMessage {
    pub fn channel(&self) -> &ChannelId {
        match self {
            InboundMessage::Recv { channel, .. }
            | InboundMessage::Acknowledgement { channel, .. }
            | InboundMessage::Timeout { channel, .. }
            | InboundMessage::ChannelClosed { channel } => channel,
        }
    }
}

/// Something the transport should do on behalf of this chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundMessage {
    SendPacket {
        channel: ChannelId,
        data: Vec<u8>,
        /// Counterparty block time after which the packet times out.
        timeout: Timestamp,
    },
    WriteAck {
        channel: ChannelId,
        sequence: Sequence,
        ack: Acknowledgement,
    },
    CloseChannel { channel: ChannelId },
}

/// Output of one dispatcher step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<E> {
    pub outbound: Vec<OutboundMessage>,
    pub effects: Vec<E>,
}

impl<E> Default for Dispatch<E> {
    fn default() -> Self {
        Self {
            outbound: Vec::new(),
            effects: Vec::new(),
        }
    }
}

impl<E> Dispatch<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, channel: ChannelId, data: Vec<u8>, timeout: Timestamp) {
        self.outbound.push(OutboundMessage::SendPacket {
            channel,
            data,
            timeout,
        });
    }

    pub fn ack(&mut self, channel: ChannelId, sequence: Sequence, ack: Acknowledgement) {
        self.outbound.push(OutboundMessage::WriteAck {
            channel,
            sequence,
            ack,
        });
    }

    pub fn close(&mut self, channel: ChannelId) {
        self.outbound.push(OutboundMessage::CloseChannel { channel });
    }

    pub fn effect(&mut self, effect: E) {
        self.effects.push(effect);
    }

    pub fn merge(&mut self, other: Dispatch<E>) {
        self.outbound.extend(other.outbound);
        self.effects.extend(other.effects);
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.effects.is_empty()
    }
}
