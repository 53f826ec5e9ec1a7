//! # Identifiers
//!
//! Chain, channel and validator identities plus block time.
//!
//! ## Clusters
//!
//! - **Chains**: `ChainId`, `ChannelId`
//! - **Validators**: `ConsAddress`, `Power`
//! - **Time**: `Timestamp`, `VscId`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// Validator set change identifier. Strictly increasing per provider.
pub type VscId = u64;

/// Tendermint-style voting power. Signed so that debt arithmetic on the
/// slash meter never needs conversions.
pub type Power = i64;

/// A 32-byte hash (SHA-256).
pub type Hash = [u8; 32];

// =============================================================================
// CLUSTER A: CHAINS
// =============================================================================

/// Identifier of a chain (provider or consumer).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of one end of an ordered channel (e.g. `channel-0`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// =============================================================================
// CLUSTER B: VALIDATORS
// =============================================================================

/// Length of a validator consensus address in bytes.
pub const CONS_ADDRESS_LEN: usize = 20;

/// Validator consensus address.
///
/// Serialized as lowercase hex so packet payloads stay human readable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConsAddress(pub [u8; CONS_ADDRESS_LEN]);

impl ConsAddress {
    pub fn new(bytes: [u8; CONS_ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic address from a moniker (first 20 bytes of its SHA-256).
    pub fn derive(moniker: &str) -> Self {
        let digest = Sha256::digest(moniker.as_bytes());
        let mut bytes = [0u8; CONS_ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..CONS_ADDRESS_LEN]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CONS_ADDRESS_LEN] {
        &self.0
    }

    /// Parse from a hex string, rejecting anything that is not exactly 20 bytes.
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s).ok()?;
        let bytes: [u8; CONS_ADDRESS_LEN] = raw.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ConsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ConsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsAddress({})", self.to_hex())
    }
}

impl Serialize for ConsAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ConsAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid consensus address: {s}")))
    }
}

// =============================================================================
// CLUSTER C: TIME
// =============================================================================

/// Block time in whole seconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Far-future sentinel used for permanent jailing.
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_secs(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs.as_secs()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
