//! Ledger client used when no token contract is configured.

use async_trait::async_trait;
use coupon_common::LedgerAddress;

use crate::client::{LedgerClient, PendingTransfer, TokenInfo, TransferReceipt};
use crate::error::{LedgerError, LedgerResult};

const NOT_CONFIGURED: &str = "no token contract configured";

/// A ledger that refuses every call.
///
/// Lets the store-only operations run without a ledger connection; anything
/// that needs the ledger fails with [`LedgerError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLedger;

#[async_trait]
impl LedgerClient for OfflineLedger {
    async fn decimals(&self) -> LedgerResult<u32> {
        Err(LedgerError::Unavailable(NOT_CONFIGURED.to_string()))
    }

    async fn balance_of(&self, _address: &LedgerAddress) -> LedgerResult<u128> {
        Err(LedgerError::Unavailable(NOT_CONFIGURED.to_string()))
    }

    async fn signer_address(&self) -> LedgerResult<LedgerAddress> {
        Err(LedgerError::Unavailable(NOT_CONFIGURED.to_string()))
    }

    async fn transfer(
        &self,
        _recipient: &LedgerAddress,
        _amount: u128,
    ) -> LedgerResult<PendingTransfer> {
        Err(LedgerError::Unavailable(NOT_CONFIGURED.to_string()))
    }

    async fn wait_for_receipt(&self, _pending: &PendingTransfer) -> LedgerResult<TransferReceipt> {
        Err(LedgerError::Unavailable(NOT_CONFIGURED.to_string()))
    }

    async fn token_info(&self) -> LedgerResult<TokenInfo> {
        Err(LedgerError::Unavailable(NOT_CONFIGURED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_is_unavailable() {
        let ledger = OfflineLedger;
        assert!(matches!(
            ledger.decimals().await,
            Err(LedgerError::Unavailable(_))
        ));
        assert!(matches!(
            ledger.token_info().await,
            Err(LedgerError::Unavailable(_))
        ));
    }
}
