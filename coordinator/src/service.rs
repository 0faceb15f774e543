//! Coupon service facade.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use coupon_common::{Coupon, CouponError, CouponId, CouponStatus, LedgerAddress, Result};
use coupon_ledger::{format_units, AddressValidator, LedgerClient, LedgerError};
use coupon_store::CouponStore;

use crate::config::CoordinatorConfig;
use crate::lifecycle::{CouponStats, CouponUpdate, CreateBatchRequest, LifecycleManager};
use crate::lock_manager::LockManager;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::redemption::{RedemptionCoordinator, RedemptionOutcome};

/// Token metadata with the supply formatted for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    /// Total supply in base units, as a decimal string.
    pub total_supply: String,
    pub total_supply_formatted: String,
}

/// Token balance of one address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    pub address: LedgerAddress,
    /// Balance in base units, as a decimal string.
    pub balance: String,
    pub balance_formatted: String,
    pub symbol: String,
}

/// Entry point for every coupon operation.
pub struct CouponService {
    lifecycle: LifecycleManager,
    redemption: RedemptionCoordinator,
    ledger: Arc<dyn LedgerClient>,
    validator: Arc<dyn AddressValidator>,
    locks: Arc<LockManager>,
    metrics: Arc<Metrics>,
}

impl CouponService {
    /// Wire a service over the given collaborators.
    pub fn new(
        config: &CoordinatorConfig,
        store: Arc<dyn CouponStore>,
        ledger: Arc<dyn LedgerClient>,
        validator: Arc<dyn AddressValidator>,
    ) -> Self {
        let locks = Arc::new(LockManager::new(config.lock_config.clone()));
        let metrics = Arc::new(Metrics::new());

        let lifecycle = LifecycleManager::new(
            store.clone(),
            validator.clone(),
            locks.clone(),
            metrics.clone(),
            config.batch_limits.clone(),
        );
        let redemption = RedemptionCoordinator::new(
            store,
            ledger.clone(),
            validator.clone(),
            locks.clone(),
            metrics.clone(),
            config.redemption_config.clone(),
        );

        info!(data_file = %config.data_file.display(), "Coupon service initialized");

        Self {
            lifecycle,
            redemption,
            ledger,
            validator,
            locks,
            metrics,
        }
    }

    /// Issue a batch of pending coupons.
    pub async fn create_batch(&self, request: CreateBatchRequest) -> Result<Vec<Coupon>> {
        self.lifecycle.create_batch(request).await
    }

    /// List coupons, optionally filtered by status.
    pub fn list(&self, status: Option<CouponStatus>) -> Vec<Coupon> {
        self.lifecycle.list(status)
    }

    /// Fetch one coupon.
    pub fn get(&self, id: CouponId) -> Result<Coupon> {
        self.lifecycle.get(id)
    }

    /// Apply field changes to one coupon.
    pub async fn apply_update(&self, id: CouponId, update: CouponUpdate) -> Result<Coupon> {
        self.lifecycle.apply_update(id, update).await
    }

    /// Delete a coupon that was never redeemed.
    pub async fn delete_coupon(&self, id: CouponId) -> Result<()> {
        self.lifecycle.delete_coupon(id).await
    }

    /// Redeem a coupon on the ledger.
    pub async fn redeem(&self, id: CouponId, recipient: Option<&str>) -> Result<RedemptionOutcome> {
        self.redemption.redeem(id, recipient).await
    }

    /// Aggregate counts and values.
    pub fn stats(&self) -> Result<CouponStats> {
        self.lifecycle.stats()
    }

    /// Token name, symbol, decimals and supply.
    #[instrument(skip(self))]
    pub async fn token_info(&self) -> Result<TokenSummary> {
        let token = self.ledger.token_info().await.map_err(ledger_error)?;

        Ok(TokenSummary {
            total_supply_formatted: format_units(token.total_supply, token.decimals),
            total_supply: token.total_supply.to_string(),
            name: token.name,
            symbol: token.symbol,
            decimals: token.decimals,
        })
    }

    /// Token balance of `address`.
    #[instrument(skip(self))]
    pub async fn balance_of(&self, address: &str) -> Result<BalanceReport> {
        if !self.validator.is_valid_address(address) {
            return Err(CouponError::validation(
                "address",
                format!("'{address}' is not a valid ledger address"),
            ));
        }
        let address = LedgerAddress::new(address);

        let token = self.ledger.token_info().await.map_err(ledger_error)?;
        let balance = self.ledger.balance_of(&address).await.map_err(ledger_error)?;

        Ok(BalanceReport {
            address,
            balance: balance.to_string(),
            balance_formatted: format_units(balance, token.decimals),
            symbol: token.symbol,
        })
    }

    /// Current counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of coupons with an operation in flight.
    pub fn active_coupon_locks(&self) -> usize {
        self.locks.active_coupon_locks()
    }
}

fn ledger_error(err: LedgerError) -> CouponError {
    CouponError::Ledger(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coupon_ledger::{EvmAddressValidator, OfflineLedger, SimulatedLedger};
    use coupon_store::MemoryStore;
    use rust_decimal_macros::dec;

    const SIGNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

    fn create_test_service(ledger: Arc<dyn LedgerClient>) -> CouponService {
        CouponService::new(
            &CoordinatorConfig::default(),
            Arc::new(MemoryStore::new()),
            ledger,
            Arc::new(EvmAddressValidator::default()),
        )
    }

    fn simulated() -> Arc<SimulatedLedger> {
        Arc::new(SimulatedLedger::new(
            LedgerAddress::new(SIGNER),
            18,
            1_000_000 * ONE_TOKEN,
        ))
    }

    #[tokio::test]
    async fn test_batch_redeem_stats_scenario() {
        let service = create_test_service(simulated());

        let coupons = service
            .create_batch(CreateBatchRequest {
                count: 3,
                unit_value: dec!(10),
                recipient_address: None,
                description: None,
            })
            .await
            .unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.total_value.to_string(), "30.000000000000000000");

        service.redeem(coupons[0].id, Some(RECIPIENT)).await.unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.redeemed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.redeemed_value.to_string(), "10.000000000000000000");
        assert_eq!(stats.total_value.to_string(), "30.000000000000000000");

        let redeemed = service.list(Some(CouponStatus::Redeemed));
        assert_eq!(redeemed.len(), 1);
        assert_eq!(redeemed[0].id, coupons[0].id);

        let err = service.delete_coupon(coupons[0].id).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STATE");
        assert_eq!(service.active_coupon_locks(), 0);

        let metrics = service.metrics();
        assert_eq!(metrics.coupons_created, 3);
        assert_eq!(metrics.redemptions_succeeded, 1);
    }

    #[tokio::test]
    async fn test_token_queries() {
        let ledger = simulated();
        ledger.set_balance(&LedgerAddress::new(RECIPIENT), 1_500_000_000_000_000_000);
        let service = create_test_service(ledger);

        let token = service.token_info().await.unwrap();
        assert_eq!(token.symbol, "LUXAE");
        assert_eq!(token.total_supply_formatted, "1000000.0");

        let balance = service.balance_of(RECIPIENT).await.unwrap();
        assert_eq!(balance.balance, "1500000000000000000");
        assert_eq!(balance.balance_formatted, "1.5");

        let err = service.balance_of("0x12").await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_offline_ledger() {
        let service = create_test_service(Arc::new(OfflineLedger));

        let coupon = service
            .create_batch(CreateBatchRequest {
                count: 1,
                unit_value: dec!(1),
                recipient_address: Some(RECIPIENT.to_string()),
                description: None,
            })
            .await
            .unwrap()
            .remove(0);

        let err = service.token_info().await.unwrap_err();
        assert_eq!(err.error_code(), "LEDGER_ERROR");

        let err = service.redeem(coupon.id, None).await.unwrap_err();
        assert_eq!(err.error_code(), "TRANSFER_FAILED");
        assert!(service.get(coupon.id).unwrap().is_pending());
    }
}
