//! Volatile coupon store.

use parking_lot::RwLock;

use coupon_common::{Coupon, CouponId, CouponStatus};

use crate::error::StoreResult;
use crate::snapshot::Snapshot;
use crate::store::CouponStore;

/// Coupon store held entirely in memory.
///
/// Mutations are applied to a copy and swapped in, matching the
/// all-or-nothing behaviour of the file-backed store.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: RwLock<Snapshot>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `coupons`.
    pub fn with_coupons(coupons: Vec<Coupon>) -> Self {
        Self {
            snapshot: RwLock::new(Snapshot { coupons }),
        }
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut Snapshot) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.snapshot.write();
        let mut next = guard.clone();
        let out = apply(&mut next)?;
        *guard = next;
        Ok(out)
    }
}

impl CouponStore for MemoryStore {
    fn list(&self, status: Option<CouponStatus>) -> Vec<Coupon> {
        self.snapshot.read().clone().filtered(status)
    }

    fn get(&self, id: &CouponId) -> StoreResult<Coupon> {
        self.snapshot.read().find(id).cloned()
    }

    fn insert(&self, coupons: Vec<Coupon>) -> StoreResult<()> {
        self.mutate(|snapshot| snapshot.append(coupons))
    }

    fn update(&self, id: &CouponId, coupon: Coupon) -> StoreResult<()> {
        self.mutate(|snapshot| snapshot.replace(id, coupon))
    }

    fn delete(&self, id: &CouponId) -> StoreResult<Coupon> {
        self.mutate(|snapshot| snapshot.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use coupon_common::{now, CouponCode, TokenAmount};
    use rust_decimal_macros::dec;

    fn coupon(index: usize) -> Coupon {
        let at = now();
        Coupon::new_pending(
            CouponCode::derive(at, index),
            TokenAmount::from_decimal(dec!(1)).unwrap(),
            None,
            None,
            at,
        )
    }

    #[test]
    fn test_insert_preserves_order() {
        let store = MemoryStore::new();
        let batch: Vec<Coupon> = (0..3).map(coupon).collect();
        let ids: Vec<CouponId> = batch.iter().map(|c| c.id).collect();

        store.insert(batch).unwrap();
        store.insert(vec![coupon(3)]).unwrap();

        let listed: Vec<CouponId> = store.list(None).iter().map(|c| c.id).collect();
        assert_eq!(listed.len(), 4);
        assert_eq!(&listed[..3], &ids[..]);
    }

    #[test]
    fn test_duplicate_batch_leaves_store_unchanged() {
        let store = MemoryStore::new();
        let first = coupon(0);
        store.insert(vec![first.clone()]).unwrap();

        let result = store.insert(vec![coupon(1), first.clone()]);
        assert!(matches!(result, Err(StoreError::Duplicate(id)) if id == first.id));
        assert_eq!(store.list(None).len(), 1);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let store = MemoryStore::new();
        let missing = coupon(0);

        assert!(matches!(
            store.update(&missing.id, missing.clone()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.delete(&missing.id), Err(StoreError::NotFound(_))));
        assert!(matches!(store.get(&missing.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_status_filter() {
        let mut cancelled = coupon(1);
        cancelled
            .transition_to(CouponStatus::Cancelled, now())
            .unwrap();
        let store = MemoryStore::with_coupons(vec![coupon(0), cancelled.clone()]);

        let listed = store.list(Some(CouponStatus::Cancelled));
        assert_eq!(listed, vec![cancelled]);
        assert_eq!(store.list(Some(CouponStatus::Pending)).len(), 1);
        assert!(store.list(Some(CouponStatus::Redeemed)).is_empty());
    }
}
