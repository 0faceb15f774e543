//! In-process ledger for tests and local simulation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use coupon_common::{LedgerAddress, TxHash};

use crate::client::{LedgerClient, PendingTransfer, ReceiptStatus, TokenInfo, TransferReceipt};
use crate::error::{LedgerError, LedgerResult};

/// Failure to inject into the next submitted transfer.
#[derive(Debug, Clone)]
enum InjectedFault {
    Reject(String),
    Revert,
    ConfirmationTimeout,
}

/// Outcome decided when a transfer is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Mine,
    Revert,
    Vanish,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<LedgerAddress, u128>,
    in_flight: HashMap<TxHash, Fate>,
    confirmed: Vec<PendingTransfer>,
    next_fault: Option<InjectedFault>,
}

/// A simulated token ledger with a single signing account.
pub struct SimulatedLedger {
    name: String,
    symbol: String,
    decimals: u32,
    total_supply: u128,
    signer: LedgerAddress,
    confirmation_delay: Duration,
    nonce: AtomicU64,
    block: AtomicU64,
    state: Mutex<LedgerState>,
}

impl SimulatedLedger {
    /// Create a ledger where `signer` holds the whole `supply`.
    pub fn new(signer: LedgerAddress, decimals: u32, supply: u128) -> Self {
        let mut state = LedgerState::default();
        state.balances.insert(signer.clone(), supply);

        Self {
            name: "Luxae".to_string(),
            symbol: "LUXAE".to_string(),
            decimals,
            total_supply: supply,
            signer,
            confirmation_delay: Duration::ZERO,
            nonce: AtomicU64::new(0),
            block: AtomicU64::new(1),
            state: Mutex::new(state),
        }
    }

    /// Delay every confirmation, to widen race windows in tests.
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Override token name and symbol.
    pub fn with_token(mut self, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        self.name = name.into();
        self.symbol = symbol.into();
        self
    }

    /// Current balance of an address.
    pub fn balance(&self, address: &LedgerAddress) -> u128 {
        self.state
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Overwrite the balance of an address.
    pub fn set_balance(&self, address: &LedgerAddress, amount: u128) {
        self.state.lock().balances.insert(address.clone(), amount);
    }

    /// Transfers that were mined successfully, in order.
    pub fn transfers(&self) -> Vec<PendingTransfer> {
        self.state.lock().confirmed.clone()
    }

    /// Make the next `transfer` call fail at submission.
    pub fn reject_next_transfer(&self, reason: impl Into<String>) {
        self.state.lock().next_fault = Some(InjectedFault::Reject(reason.into()));
    }

    /// Make the next submitted transfer revert when mined.
    pub fn revert_next_transfer(&self) {
        self.state.lock().next_fault = Some(InjectedFault::Revert);
    }

    /// Make the next submitted transfer settle while its confirmation is lost.
    pub fn lose_next_confirmation(&self) {
        self.state.lock().next_fault = Some(InjectedFault::ConfirmationTimeout);
    }

    fn next_hash(&self) -> TxHash {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        TxHash::new(format!("0x{nonce:064x}"))
    }

    /// Move tokens from the signer; returns false when the signer is short.
    fn settle(state: &mut LedgerState, from: &LedgerAddress, pending: &PendingTransfer) -> bool {
        let available = state.balances.get(from).copied().unwrap_or_default();
        if available < pending.amount {
            return false;
        }
        state.balances.insert(from.clone(), available - pending.amount);
        *state.balances.entry(pending.recipient.clone()).or_default() += pending.amount;
        state.confirmed.push(pending.clone());
        true
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn decimals(&self) -> LedgerResult<u32> {
        Ok(self.decimals)
    }

    async fn balance_of(&self, address: &LedgerAddress) -> LedgerResult<u128> {
        Ok(self.balance(address))
    }

    async fn signer_address(&self) -> LedgerResult<LedgerAddress> {
        Ok(self.signer.clone())
    }

    async fn transfer(
        &self,
        recipient: &LedgerAddress,
        amount: u128,
    ) -> LedgerResult<PendingTransfer> {
        let fault = self.state.lock().next_fault.take();
        let fate = match fault {
            Some(InjectedFault::Reject(reason)) => {
                warn!(recipient = %recipient, amount, reason = %reason, "Simulated transfer rejected");
                return Err(LedgerError::Rejected(reason));
            }
            Some(InjectedFault::Revert) => Fate::Revert,
            Some(InjectedFault::ConfirmationTimeout) => Fate::Vanish,
            None => Fate::Mine,
        };

        let pending = PendingTransfer {
            hash: self.next_hash(),
            recipient: recipient.clone(),
            amount,
        };
        self.state.lock().in_flight.insert(pending.hash.clone(), fate);

        debug!(hash = %pending.hash, recipient = %recipient, amount, "Simulated transfer submitted");
        Ok(pending)
    }

    async fn wait_for_receipt(&self, pending: &PendingTransfer) -> LedgerResult<TransferReceipt> {
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }

        let mut state = self.state.lock();
        let fate = state.in_flight.remove(&pending.hash).ok_or_else(|| {
            LedgerError::Rpc(format!("unknown transaction {}", pending.hash))
        })?;

        let block_number = self.block.fetch_add(1, Ordering::SeqCst);
        match fate {
            Fate::Mine if Self::settle(&mut state, &self.signer, pending) => {
                info!(hash = %pending.hash, block_number, "Simulated transfer confirmed");
                Ok(TransferReceipt {
                    hash: pending.hash.clone(),
                    block_number,
                    status: ReceiptStatus::Confirmed,
                })
            }
            Fate::Mine | Fate::Revert => Ok(TransferReceipt {
                hash: pending.hash.clone(),
                block_number,
                status: ReceiptStatus::Reverted,
            }),
            Fate::Vanish => {
                Self::settle(&mut state, &self.signer, pending);
                Err(LedgerError::ConfirmationTimeout {
                    hash: pending.hash.to_string(),
                })
            }
        }
    }

    async fn token_info(&self) -> LedgerResult<TokenInfo> {
        Ok(TokenInfo {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            total_supply: self.total_supply,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> LedgerAddress {
        LedgerAddress::new("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
    }

    fn recipient() -> LedgerAddress {
        LedgerAddress::new("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
    }

    #[tokio::test]
    async fn test_transfer_moves_balance_on_confirmation() {
        let ledger = SimulatedLedger::new(signer(), 18, 1_000);

        let pending = ledger.transfer(&recipient(), 400).await.unwrap();
        assert_eq!(ledger.balance(&signer()), 1_000);

        let receipt = ledger.wait_for_receipt(&pending).await.unwrap();
        assert!(receipt.is_confirmed());
        assert_eq!(receipt.hash, pending.hash);
        assert_eq!(ledger.balance(&signer()), 600);
        assert_eq!(ledger.balance(&recipient()), 400);
        assert_eq!(ledger.transfers().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_transfer() {
        let ledger = SimulatedLedger::new(signer(), 18, 1_000);
        ledger.reject_next_transfer("nonce too low");

        let err = ledger.transfer(&recipient(), 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        assert!(ledger.transfer(&recipient(), 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_reverted_transfer_keeps_balance() {
        let ledger = SimulatedLedger::new(signer(), 18, 1_000);
        ledger.revert_next_transfer();

        let pending = ledger.transfer(&recipient(), 10).await.unwrap();
        let receipt = ledger.wait_for_receipt(&pending).await.unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Reverted);
        assert_eq!(ledger.balance(&signer()), 1_000);
        assert!(ledger.transfers().is_empty());
    }

    #[tokio::test]
    async fn test_overdrawn_transfer_reverts() {
        let ledger = SimulatedLedger::new(signer(), 18, 5);
        let pending = ledger.transfer(&recipient(), 10).await.unwrap();
        let receipt = ledger.wait_for_receipt(&pending).await.unwrap();
        assert!(!receipt.is_confirmed());
    }

    #[tokio::test]
    async fn test_lost_confirmation_still_settles() {
        let ledger = SimulatedLedger::new(signer(), 18, 1_000);
        ledger.lose_next_confirmation();

        let pending = ledger.transfer(&recipient(), 10).await.unwrap();
        let err = ledger.wait_for_receipt(&pending).await.unwrap_err();
        assert!(err.is_indeterminate());
        assert_eq!(ledger.balance(&recipient()), 10);
    }

    #[tokio::test]
    async fn test_token_info() {
        let ledger = SimulatedLedger::new(signer(), 6, 1_000_000).with_token("Test", "TST");
        let info = ledger.token_info().await.unwrap();
        assert_eq!(info.symbol, "TST");
        assert_eq!(info.decimals, 6);
        assert_eq!(info.total_supply, 1_000_000);
    }
}
