//! # Consumer Registry
//!
//! Lifecycle of consumer chains as seen by the provider.
//!
//! | State | VSC packets |
//! |-------|-------------|
//! | `Pending` | queued locally until the channel is established |
//! | `Established` | sent on the channel at end block |
//!
//! Removal (stop proposal, VSC timeout, channel close) deletes the entry.

use crate::error::{ProviderError, ProviderResult};
use ccv_types::{ChainId, ChannelId, ConsAddress, Timestamp, VscId, VscPacket};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Consumer addition proposal contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerAddition {
    pub chain_id: ChainId,
    pub spawn_time: Timestamp,
    pub initial_height: u64,
    /// Hash of the consumer genesis (hex).
    pub genesis_hash: String,
    /// Hash of the consumer binary (hex).
    pub binary_hash: String,
}

impl ConsumerAddition {
    /// Addition with initial height 1. Hashes are hex-encoded SHA-256 digests.
    pub fn new(
        chain_id: impl Into<String>,
        spawn_time: Timestamp,
        genesis_hash: impl Into<String>,
        binary_hash: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: ChainId::new(chain_id),
            spawn_time,
            initial_height: 1,
            genesis_hash: genesis_hash.into(),
            binary_hash: binary_hash.into(),
        }
    }

    pub fn validate(&self) -> ProviderResult<()> {
        let invalid = |reason: &str| ProviderError::InvalidConsumerAddition {
            reason: reason.to_string(),
        };
        if self.chain_id.as_str().trim().is_empty() {
            return Err(invalid("chain id cannot be blank"));
        }
        if !is_digest_hex(&self.genesis_hash) {
            return Err(invalid("genesis hash must be a 32-byte hex digest"));
        }
        if !is_digest_hex(&self.binary_hash) {
            return Err(invalid("binary hash must be a 32-byte hex digest"));
        }
        if self.initial_height == 0 {
            return Err(invalid("initial height cannot be zero"));
        }
        Ok(())
    }
}

fn is_digest_hex(s: &str) -> bool {
    hex::decode(s).is_ok_and(|bytes| bytes.len() == 32)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsumerStatus {
    Pending,
    Established { channel: ChannelId },
}

/// Provider-side state for one consumer chain.
#[derive(Clone, Debug)]
pub struct ConsumerChain {
    pub addition: ConsumerAddition,
    pub status: ConsumerStatus,
    pub added_at: Timestamp,
    /// VSC packets built before the channel was established.
    pub pending_packets: Vec<VscPacket>,
    /// Highest VSC id actually sent on the channel (0 before the first).
    pub highest_sent_vsc: VscId,
    /// Downtime reports handled since the last VSC built for this consumer.
    pub slash_acks: Vec<ConsAddress>,
}

impl ConsumerChain {
    pub fn channel(&self) -> Option<&ChannelId> {
        match &self.status {
            ConsumerStatus::Established { channel } => Some(channel),
            ConsumerStatus::Pending => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsumerRegistry {
    chains: BTreeMap<ChainId, ConsumerChain>,
    by_channel: BTreeMap<ChannelId, ChainId>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, addition: ConsumerAddition, now: Timestamp) -> ProviderResult<()> {
        addition.validate()?;
        if self.chains.contains_key(&addition.chain_id) {
            return Err(ProviderError::DuplicateConsumer {
                chain_id: addition.chain_id,
            });
        }
        self.chains.insert(
            addition.chain_id.clone(),
            ConsumerChain {
                addition,
                status: ConsumerStatus::Pending,
                added_at: now,
                pending_packets: Vec::new(),
                highest_sent_vsc: 0,
                slash_acks: Vec::new(),
            },
        );
        Ok(())
    }

    /// Bind a channel; returns the packets that were waiting for it.
    pub fn establish(
        &mut self,
        chain_id: &ChainId,
        channel: ChannelId,
    ) -> ProviderResult<Vec<VscPacket>> {
        if let Some(owner) = self.by_channel.get(&channel) {
            return Err(ProviderError::ChannelInUse {
                channel,
                chain_id: owner.clone(),
            });
        }
        let chain = self
            .chains
            .get_mut(chain_id)
            .ok_or_else(|| ProviderError::UnknownConsumer {
                chain_id: chain_id.clone(),
            })?;
        if let ConsumerStatus::Established { channel: existing } = &chain.status {
            return Err(ProviderError::AlreadyEstablished {
                chain_id: chain_id.clone(),
                channel: existing.clone(),
            });
        }
        chain.status = ConsumerStatus::Established {
            channel: channel.clone(),
        };
        self.by_channel.insert(channel, chain_id.clone());
        let mut pending = std::mem::take(&mut chain.pending_packets);
        pending.sort_by_key(|p| p.vsc_id);
        Ok(pending)
    }

    pub fn remove(&mut self, chain_id: &ChainId) -> Option<ConsumerChain> {
        let chain = self.chains.remove(chain_id)?;
        if let Some(channel) = chain.channel() {
            self.by_channel.remove(channel);
        }
        Some(chain)
    }

    pub fn get(&self, chain_id: &ChainId) -> Option<&ConsumerChain> {
        self.chains.get(chain_id)
    }

    pub fn get_mut(&mut self, chain_id: &ChainId) -> Option<&mut ConsumerChain> {
        self.chains.get_mut(chain_id)
    }

    pub fn chain_for_channel(&self, channel: &ChannelId) -> Option<&ChainId> {
        self.by_channel.get(channel)
    }

    pub fn contains(&self, chain_id: &ChainId) -> bool {
        self.chains.contains_key(chain_id)
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.chains.keys().cloned().collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ChainId, &mut ConsumerChain)> {
        self.chains.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
