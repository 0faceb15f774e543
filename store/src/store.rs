//! Coupon store abstraction.

use coupon_common::{Coupon, CouponId, CouponStatus};

use crate::error::StoreResult;

/// Keyed, insertion-ordered persistence of coupon records.
///
/// Implementations replace the whole collection on every write: either the
/// new snapshot is stored or the previous one stays intact. They are not
/// safe for concurrent writers; callers hold a single write lock around
/// every read-modify-write sequence.
pub trait CouponStore: Send + Sync {
    /// All coupons, or those with `status`, in insertion order.
    ///
    /// Unreadable or corrupt storage yields an empty list instead of an error.
    fn list(&self, status: Option<CouponStatus>) -> Vec<Coupon>;

    /// Fetch one coupon.
    fn get(&self, id: &CouponId) -> StoreResult<Coupon>;

    /// Append a batch. Nothing is appended unless the whole write succeeds.
    fn insert(&self, coupons: Vec<Coupon>) -> StoreResult<()>;

    /// Replace the record stored under `id`.
    fn update(&self, id: &CouponId, coupon: Coupon) -> StoreResult<()>;

    /// Remove the record stored under `id`, returning it.
    fn delete(&self, id: &CouponId) -> StoreResult<Coupon>;
}

