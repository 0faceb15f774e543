//! Store error types.

use std::io;
use std::path::PathBuf;

use coupon_common::{CouponError, CouponId};
use thiserror::Error;

/// Errors that can occur while reading or writing coupon snapshots.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this ID.
    #[error("Coupon not found: {0}")]
    NotFound(CouponId),

    /// A record with this ID already exists.
    #[error("Duplicate coupon ID: {0}")]
    Duplicate(CouponId),

    /// Filesystem failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Backing file exists but does not hold a valid snapshot.
    #[error("Corrupt snapshot at {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Snapshot could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<StoreError> for CouponError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CouponError::NotFound(id),
            other => CouponError::Storage(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
