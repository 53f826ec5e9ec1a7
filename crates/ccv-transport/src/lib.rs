//! # CCV Transport Crate
//!
//! In-memory stand-in for the packet layer between chains. State machines
//! never touch it directly: they emit `OutboundMessage`s and consume
//! `InboundMessage`s, and a `Relayer` moves them through a `PacketTransport`.
//!
//! ## Guarantees
//!
//! | Property | How |
//! |----------|-----|
//! | Per-channel order | outbox drained in sequence order |
//! | At-most-once delivery | receipts per destination end |
//! | Ack integrity | SHA-256 commitment checked before an ack is accepted |
//! | Timeouts | judged on the destination's block time |
//!
//! No ordering holds across channels.

#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod relayer;
pub mod transport;

pub use channel::{ChannelEnd, ChannelState, Packet, INITIAL_SEQUENCE};
pub use error::{TransportError, TransportResult};
pub use relayer::{ChainHost, Relayer};
pub use transport::{InMemoryTransport, PacketTransport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
