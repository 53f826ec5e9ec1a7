//! # CCV Test Suite
//!
//! Unified test crate driving a provider and its consumers end to end through
//! the in-memory transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Network: provider + consumers + relayer, shared clock
//! └── integration/
//!     ├── downtime.rs   # bob / carol / alice scenarios
//!     ├── throttling.rs # slash meter and round-robin fairness
//!     ├── lifecycle.rs  # timeouts, retries, removal, unbonding gating
//!     └── properties.rs # randomized relay interleavings
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ccv-tests
//! RUST_LOG=debug cargo test -p ccv-tests integration::throttling
//! ```

pub mod harness;
pub mod integration;
