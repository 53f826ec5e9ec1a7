//! # CCV Consumer Crate
//!
//! The consumer chain's half of cross-chain validation. A consumer has no
//! stake of its own: it runs on the provider's validator set, applies every
//! VSC packet it receives, tells the provider when each change has matured
//! and reports validators that go offline or double sign.
//!
//! ## Module Structure
//!
//! ```text
//! ccv-consumer/
//! ├── domain/
//! │   ├── power_table.rs   # Local copy of the validator set
//! │   ├── maturity.rs      # VSC id → maturity time
//! │   ├── height_map.rs    # Block height → VSC id in force
//! │   └── liveness.rs      # Signed-blocks window
//! ├── events.rs            # ConsumerEffect
//! ├── error.rs
//! └── service.rs           # ConsumerService
//! ```
//!
//! ## Downtime Reporting
//!
//! | Check | Result |
//! |-------|--------|
//! | earlier report still unanswered | skipped |
//! | validator in the soft opt-out range | skipped |
//! | otherwise | slash packet queued, validator marked outstanding |

#![warn(clippy::all)]

pub mod domain;
pub mod error;
pub mod events;
pub mod service;

pub use domain::{HeightToVscMap, LivenessTracker, MaturitySchedule, PowerTable};
pub use error::{ConsumerError, ConsumerResult};
pub use events::{ConsumerEffect, DowntimeSkip};
pub use service::ConsumerService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
