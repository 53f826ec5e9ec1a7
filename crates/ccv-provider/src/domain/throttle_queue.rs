//! # Slash Throttle Queue
//!
//! Pending consumer slash packets, kept in an index-addressed arena with a
//! global arrival-order list and one index list per consumer.
//!
//! ```text
//! slots:   [ s0 ][ -- ][ s2 ][ s3 ]      free: [1]
//! global:  s0 → s2 → s3                  (arrival order)
//! per-consumer:
//!   chain-a: s0 → s3
//!   chain-b: s2
//! cursor:  last chain served
//! ```
//!
//! `pop_next` serves consumers round-robin starting after the cursor, so no
//! consumer is served twice in a row while another one has packets waiting.
//! A packet leaves the global and the per-consumer list in the same call.

use ccv_types::{ChainId, ChannelId, Sequence, SlashPacket, VscId};
use std::collections::{BTreeMap, VecDeque};

/// One throttled slash packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedSlash {
    pub chain_id: ChainId,
    pub channel: ChannelId,
    pub sequence: Sequence,
    pub packet: SlashPacket,
    /// Maturity acks from the same consumer that arrived after this packet.
    pub held_maturities: Vec<VscId>,
}

/// Round-robin multi-queue of slash packets.
#[derive(Debug, Default)]
pub struct ThrottleQueue {
    slots: Vec<Option<QueuedSlash>>,
    free: Vec<usize>,
    global: VecDeque<usize>,
    per_consumer: BTreeMap<ChainId, VecDeque<usize>>,
    cursor: Option<ChainId>,
}

impl ThrottleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global queue size.
    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    /// Per-consumer queue size.
    pub fn consumer_len(&self, chain_id: &ChainId) -> usize {
        self.per_consumer.get(chain_id).map(VecDeque::len).unwrap_or(0)
    }

    pub fn enqueue(&mut self, item: QueuedSlash) {
        let chain_id = item.chain_id.clone();
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(item);
                index
            }
            None => {
                self.slots.push(Some(item));
                self.slots.len() - 1
            }
        };
        self.global.push_back(index);
        self.per_consumer.entry(chain_id).or_default().push_back(index);
    }

    /// Hold a maturity ack behind the consumer's last queued packet.
    /// Returns false when the consumer has nothing queued.
    pub fn hold_maturity(&mut self, chain_id: &ChainId, vsc_id: VscId) -> bool {
        let Some(&last) = self.per_consumer.get(chain_id).and_then(VecDeque::back) else {
            return false;
        };
        match self.slots.get_mut(last).and_then(Option::as_mut) {
            Some(item) => {
                item.held_maturities.push(vsc_id);
                true
            }
            None => false,
        }
    }

    /// Chain that `pop_next` would serve.
    pub fn next_consumer(&self) -> Option<ChainId> {
        if self.global.is_empty() {
            return None;
        }
        let non_empty = |(chain, queue): (&ChainId, &VecDeque<usize>)| {
            (!queue.is_empty()).then(|| chain.clone())
        };
        if let Some(cursor) = &self.cursor {
            let after = self
                .per_consumer
                .range::<ChainId, _>((
                    std::ops::Bound::Excluded(cursor),
                    std::ops::Bound::Unbounded,
                ))
                .find_map(non_empty);
            if after.is_some() {
                return after;
            }
            return self.per_consumer.iter().find_map(non_empty);
        }
        // Nothing served yet: start with the oldest packet's consumer.
        let first = *self.global.front()?;
        self.slots
            .get(first)
            .and_then(Option::as_ref)
            .map(|item| item.chain_id.clone())
    }

    /// Remove and return the next packet in round-robin order.
    pub fn pop_next(&mut self) -> Option<QueuedSlash> {
        let chain_id = self.next_consumer()?;
        let index = self.per_consumer.get_mut(&chain_id)?.pop_front()?;
        if let Some(pos) = self.global.iter().position(|&i| i == index) {
            self.global.remove(pos);
        }
        if self.per_consumer.get(&chain_id).is_some_and(VecDeque::is_empty) {
            self.per_consumer.remove(&chain_id);
        }
        self.cursor = Some(chain_id);
        let item = self.slots.get_mut(index)?.take();
        self.free.push(index);
        item
    }

    /// Drop everything queued for a consumer (on removal).
    pub fn remove_consumer(&mut self, chain_id: &ChainId) -> Vec<QueuedSlash> {
        let Some(indices) = self.per_consumer.remove(chain_id) else {
            return Vec::new();
        };
        self.global.retain(|i| !indices.contains(i));
        let mut removed = Vec::with_capacity(indices.len());
        for index in indices {
            if let Some(item) = self.slots.get_mut(index).and_then(Option::take) {
                removed.push(item);
            }
            self.free.push(index);
        }
        removed
    }

    /// Queued packets in global arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedSlash> {
        self.global
            .iter()
            .filter_map(|&i| self.slots.get(i).and_then(Option::as_ref))
    }

    /// Global size equals the sum of per-consumer sizes.
    pub fn is_consistent(&self) -> bool {
        let sum: usize = self.per_consumer.values().map(VecDeque::len).sum();
        sum == self.global.len()
    }
}
