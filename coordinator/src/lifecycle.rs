//! Coupon issuance and state transitions.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use coupon_common::{
    now, AmountError, AmountSum, Coupon, CouponCode, CouponError, CouponId, CouponStatus,
    LedgerAddress, Result, TokenAmount,
};
use coupon_ledger::AddressValidator;
use coupon_store::CouponStore;

use crate::config::BatchLimits;
use crate::lock_manager::LockManager;
use crate::metrics::Metrics;

/// Parameters for issuing a batch of coupons.
#[derive(Debug, Clone)]
pub struct CreateBatchRequest {
    /// Number of coupons to issue.
    pub count: usize,
    /// Value of each coupon.
    pub unit_value: Decimal,
    /// Recipient to record on every coupon.
    pub recipient_address: Option<String>,
    /// Description to record on every coupon.
    pub description: Option<String>,
}

/// Field changes for one coupon. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct CouponUpdate {
    /// New status. `Redeemed` is an administrative override and moves no tokens.
    pub status: Option<CouponStatus>,
    pub recipient_address: Option<String>,
    pub description: Option<String>,
}

/// Aggregate counts and values over all coupons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponStats {
    pub total: usize,
    pub pending: usize,
    pub redeemed: usize,
    pub cancelled: usize,
    pub total_value: AmountSum,
    pub redeemed_value: AmountSum,
}

impl CouponStats {
    /// Aggregate a list of coupons.
    pub fn from_coupons(coupons: &[Coupon]) -> Result<Self> {
        let overflow = || CouponError::Conversion("coupon value sum overflowed".to_string());

        let mut stats = CouponStats {
            total: coupons.len(),
            pending: 0,
            redeemed: 0,
            cancelled: 0,
            total_value: AmountSum::new(),
            redeemed_value: AmountSum::new(),
        };

        for coupon in coupons {
            stats.total_value = stats.total_value.checked_add(&coupon.value).ok_or_else(overflow)?;
            match coupon.status {
                CouponStatus::Pending => stats.pending += 1,
                CouponStatus::Cancelled => stats.cancelled += 1,
                CouponStatus::Redeemed => {
                    stats.redeemed += 1;
                    stats.redeemed_value = stats
                        .redeemed_value
                        .checked_add(&coupon.value)
                        .ok_or_else(overflow)?;
                }
            }
        }

        Ok(stats)
    }
}

/// Validates and applies coupon creation and transitions. Performs no ledger I/O.
pub struct LifecycleManager {
    store: Arc<dyn CouponStore>,
    validator: Arc<dyn AddressValidator>,
    locks: Arc<LockManager>,
    metrics: Arc<Metrics>,
    limits: BatchLimits,
}

impl LifecycleManager {
    /// Create a new lifecycle manager.
    pub fn new(
        store: Arc<dyn CouponStore>,
        validator: Arc<dyn AddressValidator>,
        locks: Arc<LockManager>,
        metrics: Arc<Metrics>,
        limits: BatchLimits,
    ) -> Self {
        Self {
            store,
            validator,
            locks,
            metrics,
            limits,
        }
    }

    /// Issue `count` pending coupons in one store write.
    #[instrument(skip(self, request), fields(count = request.count))]
    pub async fn create_batch(&self, request: CreateBatchRequest) -> Result<Vec<Coupon>> {
        let value = self.validate_batch(&request)?;
        let recipient = self.parse_address("recipientAddress", request.recipient_address)?;
        let description = self.check_description(request.description)?;

        let created_at = now();
        let coupons: Vec<Coupon> = (0..request.count)
            .map(|index| {
                Coupon::new_pending(
                    CouponCode::derive(created_at, index),
                    value,
                    recipient.clone(),
                    description.clone(),
                    created_at,
                )
            })
            .collect();

        {
            let _write = self.locks.write().await;
            self.store.insert(coupons.clone())?;
        }

        self.metrics.batch_created(coupons.len());
        info!(
            count = coupons.len(),
            unit_value = %value,
            "Coupon batch created"
        );

        Ok(coupons)
    }

    /// Change status, recipient or description of one coupon.
    #[instrument(skip(self, update), fields(coupon_id = %id))]
    pub async fn apply_update(&self, id: CouponId, update: CouponUpdate) -> Result<Coupon> {
        let recipient = self.parse_address("recipientAddress", update.recipient_address)?;
        let description = self.check_description(update.description)?;

        let _coupon_lock = self.locks.lock_coupon(id).await?;
        let _write = self.locks.write().await;

        let mut coupon = self.store.get(&id)?;
        if coupon.status.is_terminal() {
            return Err(CouponError::not_pending(id, coupon.status));
        }

        if recipient.is_some() && !coupon.is_pending() {
            return Err(CouponError::InvalidState {
                id,
                status: coupon.status,
                message: "recipient can only change while the coupon is pending".to_string(),
            });
        }

        let at = now();
        match update.status {
            Some(status) if status == coupon.status => {}
            Some(CouponStatus::Redeemed) => {
                coupon.mark_redeemed_manually(at).map_err(|e| CouponError::InvalidState {
                    id,
                    status: e.from,
                    message: e.to_string(),
                })?;
                warn!(
                    coupon_id = %id,
                    "Coupon marked redeemed by administrative override; no tokens transferred"
                );
            }
            Some(status) => {
                coupon.transition_to(status, at).map_err(|e| CouponError::InvalidState {
                    id,
                    status: e.from,
                    message: e.to_string(),
                })?;
            }
            None => {}
        }

        if let Some(recipient) = recipient {
            coupon.recipient_address = Some(recipient);
        }
        if let Some(description) = description {
            coupon.description = Some(description);
        }
        coupon.updated_at = at;

        self.store.update(&id, coupon.clone())?;
        self.metrics.coupon_updated();
        info!(coupon_id = %id, status = %coupon.status, "Coupon updated");

        Ok(coupon)
    }

    /// Delete a pending or cancelled coupon.
    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn delete_coupon(&self, id: CouponId) -> Result<()> {
        let _coupon_lock = self.locks.lock_coupon(id).await?;
        let _write = self.locks.write().await;

        let coupon = self.store.get(&id)?;
        if !coupon.status.can_delete() {
            return Err(CouponError::InvalidState {
                id,
                status: coupon.status,
                message: "redeemed coupons cannot be deleted".to_string(),
            });
        }

        self.store.delete(&id)?;
        self.metrics.coupon_deleted();
        info!(coupon_id = %id, "Coupon deleted");
        Ok(())
    }

    /// Aggregate counts and values over all coupons.
    pub fn stats(&self) -> Result<CouponStats> {
        CouponStats::from_coupons(&self.store.list(None))
    }

    /// List coupons, optionally filtered by status.
    pub fn list(&self, status: Option<CouponStatus>) -> Vec<Coupon> {
        self.store.list(status)
    }

    /// Fetch one coupon.
    pub fn get(&self, id: CouponId) -> Result<Coupon> {
        Ok(self.store.get(&id)?)
    }

    fn validate_batch(&self, request: &CreateBatchRequest) -> Result<TokenAmount> {
        if request.count == 0 || request.count > self.limits.max_batch_size {
            return Err(CouponError::validation(
                "numberOfCoupons",
                format!(
                    "number of coupons must be an integer between 1 and {}",
                    self.limits.max_batch_size
                ),
            ));
        }

        if request.unit_value < self.limits.min_unit_value {
            return Err(CouponError::validation(
                "valuePerCoupon",
                format!(
                    "value per coupon must be at least {}",
                    self.limits.min_unit_value
                ),
            ));
        }

        TokenAmount::from_decimal(request.unit_value).map_err(|e| match e {
            AmountError::Overflow(_) => CouponError::validation(
                "valuePerCoupon",
                "value per coupon is too large to store at 18 decimal places",
            ),
            other => CouponError::validation("valuePerCoupon", other.to_string()),
        })
    }

    fn parse_address(&self, field: &str, address: Option<String>) -> Result<Option<LedgerAddress>> {
        match address {
            Some(address) if !self.validator.is_valid_address(&address) => {
                Err(CouponError::validation(
                    field,
                    format!("'{address}' is not a valid ledger address"),
                ))
            }
            Some(address) => Ok(Some(LedgerAddress::new(address))),
            None => Ok(None),
        }
    }

    fn check_description(&self, description: Option<String>) -> Result<Option<String>> {
        match description {
            Some(text) if text.chars().count() > self.limits.max_description_len => {
                Err(CouponError::validation(
                    "description",
                    format!(
                        "description cannot exceed {} characters",
                        self.limits.max_description_len
                    ),
                ))
            }
            other => Ok(other),
        }
    }
}
