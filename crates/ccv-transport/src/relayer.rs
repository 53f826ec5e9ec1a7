//! # Relayer
//!
//! Drives one chain at a time: hands it whatever the transport has for it at
//! its current block time and submits what it writes back (acks, closes).

use crate::transport::PacketTransport;
use ccv_types::{ChainId, InboundMessage, OutboundMessage, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A chain as seen by the relayer.
pub trait ChainHost {
    fn chain_id(&self) -> ChainId;

    /// Current block time.
    fn now(&self) -> Timestamp;

    /// Process one inbound message and return what the chain wrote.
    fn on_inbound(&mut self, msg: InboundMessage) -> Vec<OutboundMessage>;
}

pub struct Relayer<T: PacketTransport + ?Sized> {
    transport: Arc<T>,
    relayed: AtomicU64,
}

impl<T: PacketTransport + ?Sized> Relayer<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            relayed: AtomicU64::new(0),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Total messages handed to chains so far.
    pub fn relayed(&self) -> u64 {
        self.relayed.load(Ordering::Relaxed)
    }

    /// Submit a chain's block output. Returns how many messages were rejected.
    pub fn submit(&self, chain_id: &ChainId, outbound: Vec<OutboundMessage>) -> usize {
        self.transport.submit_all(chain_id, outbound)
    }

    /// Deliver everything pending for `host`. Returns the number delivered.
    pub fn relay_to(&self, host: &mut dyn ChainHost) -> usize {
        let chain_id = host.chain_id();
        let inbound = self.transport.deliver(&chain_id, host.now());
        let count = inbound.len();
        for msg in inbound {
            let written = host.on_inbound(msg);
            self.transport.submit_all(&chain_id, written);
        }
        if count > 0 {
            debug!("[ccv-transport] Relayed {} messages to {}", count, chain_id);
        }
        self.relayed.fetch_add(count as u64, Ordering::Relaxed);
        count
    }
}
