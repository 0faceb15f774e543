//! Ledger error types.

use thiserror::Error;

/// Errors reported by a ledger client.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// No ledger connection is configured or reachable.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused to accept the transaction.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The transaction was mined but reverted.
    #[error("Transaction {hash} reverted")]
    Reverted { hash: String },

    /// No confirmation arrived in time; the outcome is unknown.
    #[error("Timed out waiting for confirmation of {hash}")]
    ConfirmationTimeout { hash: String },

    /// Transport or RPC failure.
    #[error("Ledger RPC error: {0}")]
    Rpc(String),
}

impl LedgerError {
    /// Whether the transaction may have settled despite the error.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, LedgerError::ConfirmationTimeout { .. })
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
