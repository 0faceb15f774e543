//! Identifier types for coupons and ledger entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::time::{unix_millis, Timestamp};

/// Unique identifier for a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponId(Uuid);

impl CouponId {
    /// Create a new random coupon ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CouponId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CouponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CouponId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Human-readable coupon label.
///
/// Derived from the batch creation time and the 1-based position inside the
/// batch. Two batches created in the same millisecond produce the same codes,
/// so the code is a display label only and never used as a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    /// Prefix shared by every generated code.
    pub const PREFIX: &'static str = "LUXAE";

    /// Derive the code for the coupon at `index` (0-based) of a batch.
    pub fn derive(created_at: Timestamp, index: usize) -> Self {
        Self(format!(
            "{}-{}-{}",
            Self::PREFIX,
            unix_millis(created_at),
            index + 1
        ))
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of an account on the token ledger.
///
/// Constructing one does not validate it; the address validator collaborator
/// decides what is acceptable before a value reaches a coupon record.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerAddress(String);

impl LedgerAddress {
    /// Number of hex digits in an address body.
    pub const HEX_LEN: usize = 40;

    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the `0x` + 40 hex digit shape.
    pub fn is_well_formed(candidate: &str) -> bool {
        match candidate.strip_prefix("0x").or_else(|| candidate.strip_prefix("0X")) {
            Some(body) => {
                body.len() == Self::HEX_LEN && body.chars().all(|c| c.is_ascii_hexdigit())
            }
            None => false,
        }
    }
}

impl PartialEq for LedgerAddress {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl std::hash::Hash for LedgerAddress {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LedgerAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Hash of a confirmed ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    /// Wrap a transaction hash string.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Get the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
