//! Ledger client capability set.

use async_trait::async_trait;
use coupon_common::{LedgerAddress, TxHash};
use serde::Serialize;

use crate::error::LedgerResult;

/// Descriptive metadata about the token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    /// Total supply in base units.
    pub total_supply: u128,
}

/// A transfer accepted by the ledger but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    /// Hash assigned at submission.
    pub hash: TxHash,
    pub recipient: LedgerAddress,
    /// Amount in base units.
    pub amount: u128,
}

/// Final outcome of a transaction on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Confirmed,
    Reverted,
}

/// Receipt for a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub status: ReceiptStatus,
}

impl TransferReceipt {
    /// Check if the transfer took effect.
    pub fn is_confirmed(&self) -> bool {
        self.status == ReceiptStatus::Confirmed
    }
}

/// Operations the coupon service needs from the token ledger.
///
/// `transfer` only submits; callers must await [`LedgerClient::wait_for_receipt`]
/// before treating tokens as moved.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Number of fractional digits the token uses.
    async fn decimals(&self) -> LedgerResult<u32>;

    /// Balance of `address` in base units.
    async fn balance_of(&self, address: &LedgerAddress) -> LedgerResult<u128>;

    /// Address of the account that signs transfers.
    async fn signer_address(&self) -> LedgerResult<LedgerAddress>;

    /// Submit a transfer of `amount` base units from the signer to `recipient`.
    async fn transfer(&self, recipient: &LedgerAddress, amount: u128)
        -> LedgerResult<PendingTransfer>;

    /// Wait until the submitted transfer is mined.
    async fn wait_for_receipt(&self, pending: &PendingTransfer) -> LedgerResult<TransferReceipt>;

    /// Token metadata.
    async fn token_info(&self) -> LedgerResult<TokenInfo>;
}
