//! Redemption: the only path that moves tokens.
//!
//! A redemption holds the coupon's lock from the initial status check until
//! the redeemed record is persisted, so a second caller for the same coupon
//! only sees the coupon once the first has committed or given up.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use coupon_common::{now, Coupon, CouponError, CouponId, LedgerAddress, Result, TxHash};
use coupon_ledger::{AddressValidator, LedgerClient, LedgerError, PendingTransfer, TransferReceipt};
use coupon_store::CouponStore;

use crate::config::RedemptionConfig;
use crate::lock_manager::LockManager;
use crate::metrics::Metrics;

/// Result of a confirmed redemption.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionOutcome {
    /// Hash of the confirmed transfer.
    pub transaction_hash: TxHash,
    /// Block the transfer was mined in.
    pub block_number: u64,
    /// The coupon as persisted after redemption.
    pub coupon: Coupon,
}

/// Coordinates ledger transfers with coupon state.
pub struct RedemptionCoordinator {
    store: Arc<dyn CouponStore>,
    ledger: Arc<dyn LedgerClient>,
    validator: Arc<dyn AddressValidator>,
    locks: Arc<LockManager>,
    metrics: Arc<Metrics>,
    config: RedemptionConfig,
}

impl RedemptionCoordinator {
    /// Create a new redemption coordinator.
    pub fn new(
        store: Arc<dyn CouponStore>,
        ledger: Arc<dyn LedgerClient>,
        validator: Arc<dyn AddressValidator>,
        locks: Arc<LockManager>,
        metrics: Arc<Metrics>,
        config: RedemptionConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            validator,
            locks,
            metrics,
            config,
        }
    }

    /// Redeem a pending coupon by transferring its value to `recipient`.
    ///
    /// Without an explicit recipient the coupon's recorded recipient is used.
    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn redeem(&self, id: CouponId, recipient: Option<&str>) -> Result<RedemptionOutcome> {
        self.metrics.redemption_attempted();

        let result = self.redeem_locked(id, recipient).await;
        match &result {
            Ok(outcome) => {
                self.metrics.redemption_succeeded();
                info!(
                    coupon_id = %id,
                    tx_hash = %outcome.transaction_hash,
                    block_number = outcome.block_number,
                    "Coupon redeemed"
                );
            }
            Err(e) if e.requires_reconciliation() => {
                self.metrics.reconciliation_needed();
                error!(coupon_id = %id, error = %e, "Redemption requires manual reconciliation");
            }
            Err(e) => {
                self.metrics.redemption_failed();
                warn!(coupon_id = %id, error = %e, "Redemption failed");
            }
        }
        result
    }

    async fn redeem_locked(&self, id: CouponId, recipient: Option<&str>) -> Result<RedemptionOutcome> {
        let _coupon_lock = self.locks.lock_coupon(id).await?;

        let mut coupon = self.store.get(&id)?;
        if !coupon.is_pending() {
            return Err(CouponError::not_pending(id, coupon.status));
        }

        let recipient = self.resolve_recipient(&coupon, recipient)?;

        let decimals = self
            .ledger
            .decimals()
            .await
            .map_err(|e| transfer_failed(id, e))?;
        let amount = coupon.value.to_base_units(decimals)?;

        let signer = self
            .ledger
            .signer_address()
            .await
            .map_err(|e| transfer_failed(id, e))?;
        let available = self
            .ledger
            .balance_of(&signer)
            .await
            .map_err(|e| transfer_failed(id, e))?;
        if available < amount {
            return Err(CouponError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let pending = self
            .ledger
            .transfer(&recipient, amount)
            .await
            .map_err(|e| transfer_failed(id, e))?;
        info!(
            coupon_id = %id,
            tx_hash = %pending.hash,
            recipient = %recipient,
            amount,
            "Transfer submitted"
        );

        let receipt = self.confirm(id, &pending).await?;

        coupon
            .redeem(recipient, receipt.hash.clone(), now())
            .map_err(|e| CouponError::Internal(e.to_string()))?;

        {
            let _write = self.locks.write().await;
            self.store
                .update(&id, coupon.clone())
                .map_err(|e| CouponError::PostCommitPersistence {
                    id,
                    transaction_hash: Some(receipt.hash.clone()),
                    reason: e.to_string(),
                })?;
        }

        Ok(RedemptionOutcome {
            transaction_hash: receipt.hash,
            block_number: receipt.block_number,
            coupon,
        })
    }

    /// Wait for the transfer to be mined.
    ///
    /// Definitive failures leave the coupon pending. A lost or late
    /// confirmation is indeterminate and is reported for reconciliation.
    async fn confirm(&self, id: CouponId, pending: &PendingTransfer) -> Result<TransferReceipt> {
        let waited = match self.config.confirmation_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.ledger.wait_for_receipt(pending)).await {
                    Ok(result) => result,
                    Err(_) => Err(LedgerError::ConfirmationTimeout {
                        hash: pending.hash.to_string(),
                    }),
                }
            }
            None => self.ledger.wait_for_receipt(pending).await,
        };

        match waited {
            Ok(receipt) if receipt.is_confirmed() => Ok(receipt),
            Ok(receipt) => Err(transfer_failed(
                id,
                LedgerError::Reverted {
                    hash: receipt.hash.to_string(),
                },
            )),
            Err(e) if e.is_indeterminate() => Err(CouponError::PostCommitPersistence {
                id,
                transaction_hash: Some(pending.hash.clone()),
                reason: e.to_string(),
            }),
            Err(e) => Err(transfer_failed(id, e)),
        }
    }

    fn resolve_recipient(&self, coupon: &Coupon, requested: Option<&str>) -> Result<LedgerAddress> {
        match requested {
            Some(address) if self.validator.is_valid_address(address) => {
                Ok(LedgerAddress::new(address))
            }
            Some(address) => Err(CouponError::validation(
                "recipientAddress",
                format!("'{address}' is not a valid ledger address"),
            )),
            None => coupon.recipient_address.clone().ok_or_else(|| {
                CouponError::validation(
                    "recipientAddress",
                    "a recipient address is required to redeem this coupon",
                )
            }),
        }
    }
}

fn transfer_failed(id: CouponId, err: LedgerError) -> CouponError {
    CouponError::TransferFailed {
        id,
        reason: err.to_string(),
    }
}
