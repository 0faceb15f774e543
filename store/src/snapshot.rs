//! In-memory form of a stored collection.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use coupon_common::{Coupon, CouponId, CouponStatus};

use crate::error::{StoreError, StoreResult};

/// The full stored collection, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub coupons: Vec<Coupon>,
}

impl Snapshot {
    pub fn filtered(self, status: Option<CouponStatus>) -> Vec<Coupon> {
        match status {
            Some(status) => self
                .coupons
                .into_iter()
                .filter(|c| c.status == status)
                .collect(),
            None => self.coupons,
        }
    }

    pub fn find(&self, id: &CouponId) -> StoreResult<&Coupon> {
        self.coupons
            .iter()
            .find(|c| &c.id == id)
            .ok_or(StoreError::NotFound(*id))
    }

    fn position(&self, id: &CouponId) -> StoreResult<usize> {
        self.coupons
            .iter()
            .position(|c| &c.id == id)
            .ok_or(StoreError::NotFound(*id))
    }

    /// Append a batch, rejecting IDs already present.
    pub fn append(&mut self, batch: Vec<Coupon>) -> StoreResult<()> {
        let mut seen: HashSet<CouponId> = self.coupons.iter().map(|c| c.id).collect();
        if let Some(clash) = batch.iter().find(|c| !seen.insert(c.id)) {
            return Err(StoreError::Duplicate(clash.id));
        }
        self.coupons.extend(batch);
        Ok(())
    }

    pub fn replace(&mut self, id: &CouponId, coupon: Coupon) -> StoreResult<()> {
        let index = self.position(id)?;
        self.coupons[index] = coupon;
        Ok(())
    }

    pub fn remove(&mut self, id: &CouponId) -> StoreResult<Coupon> {
        let index = self.position(id)?;
        Ok(self.coupons.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coupon_common::{now, CouponCode, TokenAmount};
    use rust_decimal_macros::dec;

    fn batch(len: usize) -> Vec<Coupon> {
        let at = now();
        (0..len)
            .map(|index| {
                Coupon::new_pending(
                    CouponCode::derive(at, index),
                    TokenAmount::from_decimal(dec!(1)).unwrap(),
                    None,
                    None,
                    at,
                )
            })
            .collect()
    }

    #[test]
    fn test_append_rejects_repeat_within_batch() {
        let mut snapshot = Snapshot::default();
        let mut coupons = batch(3);
        coupons.push(coupons[1].clone());
        let repeated = coupons[1].id;

        let result = snapshot.append(coupons);
        assert!(matches!(result, Err(StoreError::Duplicate(id)) if id == repeated));
        assert!(snapshot.coupons.is_empty());
    }

    #[test]
    fn test_append_large_batch_onto_large_snapshot() {
        let mut snapshot = Snapshot::default();
        snapshot.append(batch(20_000)).unwrap();
        snapshot.append(batch(10_000)).unwrap();
        assert_eq!(snapshot.coupons.len(), 30_000);

        let existing = snapshot.coupons[12_345].clone();
        let mut next = batch(10_000);
        next.push(existing.clone());
        let result = snapshot.append(next);
        assert!(matches!(result, Err(StoreError::Duplicate(id)) if id == existing.id));
        assert_eq!(snapshot.coupons.len(), 30_000);
    }
}
