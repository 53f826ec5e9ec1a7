//! Adapters Layer

pub mod in_memory_staking;

pub use in_memory_staking::{InMemoryStaking, DEFAULT_POWER_REDUCTION};
