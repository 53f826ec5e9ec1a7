//! # CCV Types Crate
//!
//! Types shared by the provider, consumer and transport crates of the
//! cross-chain validation workspace.
//!
//! ## Contents
//!
//! | Module | Holds |
//! |--------|-------|
//! | `identifiers` | `ChainId`, `ChannelId`, `ConsAddress`, `Timestamp`, `VscId`, `Power` |
//! | `dec` | 18-digit fixed-point `Dec` used for fractions |
//! | `packets` | VSC, maturity and slash packets, acknowledgements, JSON codec |
//! | `messages` | Dispatcher input/output (`InboundMessage`, `Dispatch`) |
//! | `params` | `ProviderParams`, `ConsumerParams` and their validators |
//! | `soft_opt_out` | Bottom-power exemption from downtime jailing |
//! | `errors` | `CodecError`, `ParamsError` |
//!
//! ## Design Principles
//!
//! - **Transport-agnostic**: state machines consume `InboundMessage` and emit
//!   `OutboundMessage`; nothing here knows how bytes move.
//! - **Exact arithmetic**: power math never touches floating point.

#![warn(clippy::all)]

pub mod dec;
pub mod errors;
pub mod identifiers;
pub mod messages;
pub mod packets;
pub mod params;
pub mod soft_opt_out;

pub use dec::{Dec, DecError};
pub use errors::*;
pub use identifiers::*;
pub use messages::*;
pub use packets::*;
pub use params::{ConsumerParams, ProviderParams};
pub use soft_opt_out::{is_soft_opted_out, smallest_non_opt_out_power};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
