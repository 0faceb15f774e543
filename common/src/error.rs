//! Error types for coupon operations.

use crate::{AmountError, CouponId, CouponStatus, TxHash};
use thiserror::Error;

/// Main error type for coupon operations.
#[derive(Error, Debug)]
pub enum CouponError {
    /// Malformed input; the caller can correct it and retry.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// No coupon with this ID.
    #[error("Coupon not found: {0}")]
    NotFound(CouponId),

    /// Operation is illegal for the coupon's current status.
    #[error("Invalid state for coupon {id} ({status}): {message}")]
    InvalidState {
        id: CouponId,
        status: CouponStatus,
        message: String,
    },

    /// Signer holds fewer base units than the redemption needs.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u128, available: u128 },

    /// Coupon value cannot be expressed in ledger base units.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Ledger rejected or failed the transfer; no tokens moved.
    #[error("Transfer failed for coupon {id}: {reason}")]
    TransferFailed { id: CouponId, reason: String },

    /// Tokens moved on the ledger but the local record was not updated.
    #[error(
        "Transfer for coupon {id} may have settled on the ledger but the record was not \
         updated ({}): {reason}",
        .transaction_hash.as_ref().map(TxHash::as_str).unwrap_or("hash unknown")
    )]
    PostCommitPersistence {
        id: CouponId,
        transaction_hash: Option<TxHash>,
        reason: String,
    },

    /// A ledger query outside a redemption failed.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Durable read or write failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unanticipated failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CouponError {
    /// Build a validation error tied to an input field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CouponError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Build the rejection for an operation that needs a `pending` coupon.
    pub fn not_pending(id: CouponId, status: CouponStatus) -> Self {
        let message = match status {
            CouponStatus::Redeemed => "coupon has already been redeemed",
            CouponStatus::Cancelled => "coupon has been cancelled",
            CouponStatus::Pending => "coupon is pending",
        };
        CouponError::InvalidState {
            id,
            status,
            message: message.to_string(),
        }
    }

    /// Whether the caller's input or request caused the failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            CouponError::Validation { .. }
                | CouponError::NotFound(_)
                | CouponError::InvalidState { .. }
        )
    }

    /// Whether an operator has to reconcile ledger and local state by hand.
    pub fn requires_reconciliation(&self) -> bool {
        matches!(self, CouponError::PostCommitPersistence { .. })
    }

    /// Get a stable error code for callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            CouponError::Validation { .. } => "VALIDATION_ERROR",
            CouponError::NotFound(_) => "NOT_FOUND",
            CouponError::InvalidState { .. } => "INVALID_STATE",
            CouponError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            CouponError::Conversion(_) => "CONVERSION_ERROR",
            CouponError::TransferFailed { .. } => "TRANSFER_FAILED",
            CouponError::PostCommitPersistence { .. } => "POST_COMMIT_PERSISTENCE_ERROR",
            CouponError::Ledger(_) => "LEDGER_ERROR",
            CouponError::Storage(_) => "STORAGE_ERROR",
            CouponError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<AmountError> for CouponError {
    fn from(err: AmountError) -> Self {
        CouponError::Conversion(err.to_string())
    }
}

/// Result type alias for coupon operations.
pub type Result<T> = std::result::Result<T, CouponError>;
