//! # Packet Transport
//!
//! Moves `OutboundMessage`s written by one chain into `InboundMessage`s for
//! another.
//!
//! ```text
//! chain A                    transport                      chain B
//!  SendPacket ──► commit + outbox ──deliver(B, now)──► Recv (receipt kept)
//!  Acknowledgement ◄── inbox(A) ◄── clear commitment ◄── WriteAck
//!  Timeout ◄────── inbox(A) ◄── now_B >= timeout
//!  ChannelClosed ◄─ inbox(A) ◄── CloseChannel
//! ```
//!
//! Timeouts are judged against the destination's block time. A timeout does
//! not close the channel; that decision belongs to the chain that sent it.

use crate::channel::{ChannelEnd, Packet};
use crate::error::{TransportError, TransportResult};
use ccv_types::{
    Acknowledgement, ChainId, ChannelId, Hash, InboundMessage, OutboundMessage, Sequence,
    Timestamp,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

/// Carries packets between chains.
pub trait PacketTransport: Send + Sync {
    /// Accept one message written by `chain_id`.
    fn submit(&self, chain_id: &ChainId, msg: OutboundMessage) -> TransportResult<()>;

    /// Everything ready for `chain_id` at its block time `now`.
    fn deliver(&self, chain_id: &ChainId, now: Timestamp) -> Vec<InboundMessage>;

    /// Submit a batch; failures are logged. Returns how many were rejected.
    fn submit_all(&self, chain_id: &ChainId, msgs: Vec<OutboundMessage>) -> usize {
        let mut rejected = 0;
        for msg in msgs {
            if let Err(e) = self.submit(chain_id, msg) {
                warn!("[ccv-transport] Dropped message from {}: {}", chain_id, e);
                rejected += 1;
            }
        }
        rejected
    }
}

type EndKey = (ChainId, ChannelId);

#[derive(Debug, Default)]
struct TransportState {
    ends: BTreeMap<EndKey, ChannelEnd>,
    next_channel: BTreeMap<ChainId, u64>,
    /// Acks, timeouts and closes waiting for their chain.
    inboxes: BTreeMap<ChainId, VecDeque<InboundMessage>>,
}

impl TransportState {
    fn allocate_channel(&mut self, chain_id: &ChainId) -> ChannelId {
        let next = self.next_channel.entry(chain_id.clone()).or_insert(0);
        let channel = ChannelId::new(format!("channel-{next}"));
        *next += 1;
        channel
    }

    fn end(&self, chain_id: &ChainId, channel: &ChannelId) -> TransportResult<&ChannelEnd> {
        self.ends
            .get(&(chain_id.clone(), channel.clone()))
            .ok_or_else(|| TransportError::UnknownChannel {
                chain_id: chain_id.clone(),
                channel: channel.clone(),
            })
    }

    fn end_mut(
        &mut self,
        chain_id: &ChainId,
        channel: &ChannelId,
    ) -> TransportResult<&mut ChannelEnd> {
        self.ends
            .get_mut(&(chain_id.clone(), channel.clone()))
            .ok_or_else(|| TransportError::UnknownChannel {
                chain_id: chain_id.clone(),
                channel: channel.clone(),
            })
    }

    fn push_inbox(&mut self, chain_id: &ChainId, msg: InboundMessage) {
        self.inboxes.entry(chain_id.clone()).or_default().push_back(msg);
    }
}

/// In-process transport shared by every simulated chain.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    state: RwLock<TransportState>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel between two chains. Returns `(a's channel, b's channel)`.
    pub fn open_channel(
        &self,
        a: &ChainId,
        b: &ChainId,
    ) -> TransportResult<(ChannelId, ChannelId)> {
        if a == b {
            return Err(TransportError::SelfChannel {
                chain_id: a.clone(),
            });
        }
        let mut state = self.state.write();
        let a_channel = state.allocate_channel(a);
        let b_channel = state.allocate_channel(b);
        state.ends.insert(
            (a.clone(), a_channel.clone()),
            ChannelEnd::new(a.clone(), a_channel.clone(), b.clone(), b_channel.clone()),
        );
        state.ends.insert(
            (b.clone(), b_channel.clone()),
            ChannelEnd::new(b.clone(), b_channel.clone(), a.clone(), a_channel.clone()),
        );
        info!(
            "[ccv-transport] Opened {}/{} <-> {}/{}",
            a, a_channel, b, b_channel
        );
        Ok((a_channel, b_channel))
    }

    /// Hand an already-delivered packet to the relay queue again, as a
    /// misbehaving relayer would. Receipts keep it from reaching the chain twice.
    pub fn redeliver(
        &self,
        chain_id: &ChainId,
        channel: &ChannelId,
        sequence: Sequence,
    ) -> TransportResult<()> {
        let mut state = self.state.write();
        let end = state.end_mut(chain_id, channel)?;
        if end.requeue(sequence) {
            Ok(())
        } else {
            Err(TransportError::NoCommitment {
                channel: channel.clone(),
                sequence,
            })
        }
    }

    pub fn is_open(&self, chain_id: &ChainId, channel: &ChannelId) -> bool {
        self.state
            .read()
            .end(chain_id, channel)
            .map(|e| e.is_open())
            .unwrap_or(false)
    }

    pub fn counterparty(
        &self,
        chain_id: &ChainId,
        channel: &ChannelId,
    ) -> Option<(ChainId, ChannelId)> {
        self.state
            .read()
            .end(chain_id, channel)
            .ok()
            .map(|e| (e.counterparty_chain.clone(), e.counterparty_channel.clone()))
    }

    pub fn commitment(
        &self,
        chain_id: &ChainId,
        channel: &ChannelId,
        sequence: Sequence,
    ) -> Option<Hash> {
        self.state
            .read()
            .end(chain_id, channel)
            .ok()
            .and_then(|e| e.commitment(sequence))
    }

    /// Packets sent on this end that the counterparty has not received yet.
    pub fn in_flight(&self, chain_id: &ChainId, channel: &ChannelId) -> usize {
        self.state
            .read()
            .end(chain_id, channel)
            .map(|e| e.in_flight())
            .unwrap_or(0)
    }

    /// Packets sent on this end still awaiting an ack or timeout.
    pub fn unacked(&self, chain_id: &ChainId, channel: &ChannelId) -> usize {
        self.state
            .read()
            .end(chain_id, channel)
            .map(|e| e.unacked())
            .unwrap_or(0)
    }

    fn send(
        state: &mut TransportState,
        chain_id: &ChainId,
        channel: &ChannelId,
        data: Vec<u8>,
        timeout: Timestamp,
    ) -> TransportResult<()> {
        let end = state.end_mut(chain_id, channel)?;
        if !end.is_open() {
            return Err(TransportError::ChannelClosed {
                chain_id: chain_id.clone(),
                channel: channel.clone(),
            });
        }
        let sequence = end.send(data, timeout);
        debug!(
            "[ccv-transport] {}/{} sent packet {} (timeout {})",
            chain_id, channel, sequence, timeout
        );
        Ok(())
    }

    fn write_ack(
        state: &mut TransportState,
        chain_id: &ChainId,
        channel: &ChannelId,
        sequence: Sequence,
        ack: Acknowledgement,
    ) -> TransportResult<()> {
        let end = state.end(chain_id, channel)?;
        if !end.has_receipt(sequence) {
            return Err(TransportError::NoReceipt {
                channel: channel.clone(),
                sequence,
            });
        }
        let source_chain = end.counterparty_chain.clone();
        let source_channel = end.counterparty_channel.clone();
        let packet = state
            .end_mut(&source_chain, &source_channel)?
            .clear_commitment(sequence)
            .ok_or_else(|| TransportError::NoCommitment {
                channel: source_channel.clone(),
                sequence,
            })?;
        state.push_inbox(
            &source_chain,
            InboundMessage::Acknowledgement {
                channel: source_channel,
                sequence,
                data: packet.data,
                ack,
            },
        );
        Ok(())
    }

    fn close(
        state: &mut TransportState,
        chain_id: &ChainId,
        channel: &ChannelId,
    ) -> TransportResult<()> {
        let end = state.end_mut(chain_id, channel)?;
        if !end.is_open() {
            return Ok(());
        }
        end.close();
        let counterparty_chain = end.counterparty_chain.clone();
        let counterparty_channel = end.counterparty_channel.clone();
        if let Ok(other) = state.end_mut(&counterparty_chain, &counterparty_channel) {
            other.close();
        }
        state.push_inbox(
            &counterparty_chain,
            InboundMessage::ChannelClosed {
                channel: counterparty_channel.clone(),
            },
        );
        info!(
            "[ccv-transport] {} closed {} ({}/{} notified)",
            chain_id, channel, counterparty_chain, counterparty_channel
        );
        Ok(())
    }
}

impl PacketTransport for InMemoryTransport {
    fn submit(&self, chain_id: &ChainId, msg: OutboundMessage) -> TransportResult<()> {
        let mut state = self.state.write();
        match msg {
            OutboundMessage::SendPacket {
                channel,
                data,
                timeout,
            } => Self::send(&mut state, chain_id, &channel, data, timeout),
            OutboundMessage::WriteAck {
                channel,
                sequence,
                ack,
            } => Self::write_ack(&mut state, chain_id, &channel, sequence, ack),
            OutboundMessage::CloseChannel { channel } => {
                Self::close(&mut state, chain_id, &channel)
            }
        }
    }

    fn deliver(&self, chain_id: &ChainId, now: Timestamp) -> Vec<InboundMessage> {
        let mut state = self.state.write();
        let mut delivered: Vec<InboundMessage> = state
            .inboxes
            .remove(chain_id)
            .map(Vec::from)
            .unwrap_or_default();

        let sources: Vec<EndKey> = state
            .ends
            .iter()
            .filter(|(_, end)| &end.counterparty_chain == chain_id && end.is_open())
            .map(|(key, _)| key.clone())
            .collect();

        for (source_chain, source_channel) in sources {
            let mut ready: Vec<Packet> = Vec::new();
            if let Ok(source) = state.end_mut(&source_chain, &source_channel) {
                while let Some(packet) = source.pop_outbox() {
                    if packet.is_expired(now) {
                        if source.clear_commitment(packet.sequence).is_some() {
                            warn!(
                                "[ccv-transport] Packet {} on {}/{} timed out",
                                packet.sequence, source_chain, source_channel
                            );
                            ready.push(packet);
                        }
                        continue;
                    }
                    ready.push(packet);
                }
            }

            for packet in ready {
                if packet.is_expired(now) {
                    state.push_inbox(
                        &source_chain,
                        InboundMessage::Timeout {
                            channel: source_channel.clone(),
                            sequence: packet.sequence,
                            data: packet.data,
                        },
                    );
                    continue;
                }
                let Ok(destination) = state.end_mut(chain_id, &packet.destination_channel) else {
                    continue;
                };
                if !destination.receive(packet.sequence) {
                    debug!(
                        "[ccv-transport] Duplicate packet {} to {} dropped",
                        packet.sequence, chain_id
                    );
                    continue;
                }
                delivered.push(InboundMessage::Recv {
                    channel: packet.destination_channel,
                    sequence: packet.sequence,
                    data: packet.data,
                });
            }
        }
        delivered
    }
}
