//! # CCV Provider Crate
//!
//! The provider chain's half of cross-chain validation. The provider owns the
//! validator set, ships every change to its consumers as VSC packets, waits
//! for each consumer to report the change matured before unbonding completes,
//! and turns consumer infraction reports into throttled jailing.
//!
//! ## Module Structure
//!
//! ```text
//! ccv-provider/
//! ├── domain/
//! │   ├── consumer.rs        # Consumer registry (pending → established)
//! │   ├── maturity.rs        # Per-VSC outstanding maturity acks
//! │   ├── receipts.rs        # Replay protection per consumer channel
//! │   ├── slash_meter.rs     # Signed throttle meter + replenishment
//! │   ├── throttle_queue.rs  # Round-robin slash packet queue
//! │   ├── slash_log.rs       # Consumer double-sign reports
//! │   └── unbonding.rs       # Unbonding ops gated on VSC maturity
//! ├── ports/
//! │   └── outbound.rs        # StakingKeeper
//! ├── adapters/
//! │   └── in_memory_staking.rs
//! ├── executor.rs            # Jailing / slashing rules
//! ├── events.rs              # ProviderEffect
//! ├── error.rs
//! └── service.rs             # ProviderService (block driver + dispatcher)
//! ```
//!
//! ## Throttling
//!
//! | Meter | Behavior |
//! |-------|----------|
//! | `>= 0` | dequeue next slash packet (round-robin across consumers) |
//! | `< 0` | hold remaining packets until replenishment |
//!
//! Allowance is `ceil(slash_meter_replenish_fraction * total_power)`; the
//! meter never exceeds it.

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod events;
pub mod executor;
pub mod ports;
pub mod service;

pub use adapters::InMemoryStaking;
pub use domain::*;
pub use error::{ProviderError, ProviderResult, StakingError};
pub use events::{ProviderEffect, RemovalReason, SkipReason};
pub use executor::{SlashExecution, SlashExecutor, SlashOutcome};
pub use ports::{StakingKeeper, ValidatorInfo};
pub use service::{ProviderService, INITIAL_VSC_ID};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
