//! Domain Layer
//!
//! Pure provider state: no staking calls, no I/O.

pub mod consumer;
pub mod maturity;
pub mod receipts;
pub mod slash_log;
pub mod slash_meter;
pub mod throttle_queue;
pub mod unbonding;

pub use consumer::{ConsumerAddition, ConsumerChain, ConsumerRegistry, ConsumerStatus};
pub use maturity::{AckOutcome, MaturityRecord, MaturityTracker};
pub use receipts::ReceiptLog;
pub use slash_log::{Equivocation, SlashLog, SlashRecord};
pub use slash_meter::{slash_meter_allowance, SlashMeter};
pub use throttle_queue::{QueuedSlash, ThrottleQueue};
pub use unbonding::UnbondingTracker;
