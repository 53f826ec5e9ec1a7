//! Cross-chain scenarios.

pub mod downtime;
pub mod lifecycle;
pub mod properties;
pub mod throttling;
