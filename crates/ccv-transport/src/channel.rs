//! # Channel Ends
//!
//! One end of an ordered, bidirectional packet channel. The sending end keeps
//! a commitment per packet until it is acknowledged or times out; the
//! receiving end keeps a receipt per sequence so nothing is delivered twice.

use ccv_types::{ChainId, ChannelId, Hash, Sequence, Timestamp};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// First sequence number on a fresh channel end.
pub const INITIAL_SEQUENCE: Sequence = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub sequence: Sequence,
    pub source_channel: ChannelId,
    pub destination_channel: ChannelId,
    pub data: Vec<u8>,
    /// Destination block time at which delivery is no longer allowed.
    pub timeout: Timestamp,
}

impl Packet {
    /// `sha256(timeout || sequence || sha256(data))`
    pub fn commitment(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.timeout.as_secs().to_be_bytes());
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(Sha256::digest(&self.data));
        hasher.finalize().into()
    }

    pub fn is_expired(&self, destination_now: Timestamp) -> bool {
        destination_now >= self.timeout
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
}

#[derive(Debug)]
pub struct ChannelEnd {
    pub chain_id: ChainId,
    pub channel: ChannelId,
    pub counterparty_chain: ChainId,
    pub counterparty_channel: ChannelId,
    pub state: ChannelState,
    next_sequence: Sequence,
    commitments: BTreeMap<Sequence, Hash>,
    /// Sent and not yet acknowledged or timed out.
    unacked: BTreeMap<Sequence, Packet>,
    /// Sent and not yet handed to the counterparty, in send order.
    outbox: VecDeque<Sequence>,
    receipts: BTreeSet<Sequence>,
}

impl ChannelEnd {
    pub fn new(
        chain_id: ChainId,
        channel: ChannelId,
        counterparty_chain: ChainId,
        counterparty_channel: ChannelId,
    ) -> Self {
        Self {
            chain_id,
            channel,
            counterparty_chain,
            counterparty_channel,
            state: ChannelState::Open,
            next_sequence: INITIAL_SEQUENCE,
            commitments: BTreeMap::new(),
            unacked: BTreeMap::new(),
            outbox: VecDeque::new(),
            receipts: BTreeSet::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// Commit a new packet and queue it for delivery.
    pub fn send(&mut self, data: Vec<u8>, timeout: Timestamp) -> Sequence {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let packet = Packet {
            sequence,
            source_channel: self.channel.clone(),
            destination_channel: self.counterparty_channel.clone(),
            data,
            timeout,
        };
        self.commitments.insert(sequence, packet.commitment());
        self.unacked.insert(sequence, packet);
        self.outbox.push_back(sequence);
        sequence
    }

    /// Next packet awaiting delivery, if it is still committed.
    pub fn pop_outbox(&mut self) -> Option<Packet> {
        while let Some(sequence) = self.outbox.pop_front() {
            if let Some(packet) = self.unacked.get(&sequence) {
                return Some(packet.clone());
            }
        }
        None
    }

    /// Queue an already-sent packet for delivery again. Returns false if it
    /// is no longer committed.
    pub fn requeue(&mut self, sequence: Sequence) -> bool {
        if self.unacked.contains_key(&sequence) {
            self.outbox.push_back(sequence);
            true
        } else {
            false
        }
    }

    /// Remove a packet whose commitment matches. Used for both acks and timeouts.
    pub fn clear_commitment(&mut self, sequence: Sequence) -> Option<Packet> {
        let packet = self.unacked.get(&sequence)?;
        if self.commitments.get(&sequence) != Some(&packet.commitment()) {
            return None;
        }
        self.commitments.remove(&sequence);
        self.unacked.remove(&sequence)
    }

    /// Record a receipt. Returns false for a duplicate.
    pub fn receive(&mut self, sequence: Sequence) -> bool {
        self.receipts.insert(sequence)
    }

    pub fn has_receipt(&self, sequence: Sequence) -> bool {
        self.receipts.contains(&sequence)
    }

    pub fn commitment(&self, sequence: Sequence) -> Option<Hash> {
        self.commitments.get(&sequence).copied()
    }

    pub fn in_flight(&self) -> usize {
        self.outbox.len()
    }

    pub fn unacked(&self) -> usize {
        self.unacked.len()
    }

    /// Close and drop everything in flight.
    pub fn close(&mut self) {
        self.state = ChannelState::Closed;
        self.outbox.clear();
        self.unacked.clear();
        self.commitments.clear();
    }
}
