//! Write serialization and per-coupon locks.
//!
//! Two levels of locking protect the store:
//!
//! - a single write lock around every read-modify-write of the snapshot, and
//! - one lock per coupon, held for a whole operation on that coupon
//!   (including the ledger round-trip of a redemption).
//!
//! Callers always take the coupon lock before the write lock.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tracing::{debug, warn};

use coupon_common::{CouponError, CouponId, CouponStatus, Result};

use crate::config::LockConfig;

type CouponLockTable = DashMap<CouponId, Arc<Mutex<()>>>;

/// Exclusive hold on one coupon. The table entry is pruned on drop when no
/// other caller is waiting for it.
pub struct CouponGuard {
    id: CouponId,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<CouponLockTable>,
}

impl CouponGuard {
    /// The coupon this guard protects.
    pub fn coupon_id(&self) -> CouponId {
        self.id
    }
}

impl Drop for CouponGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Clones of the mutex are only handed out under the shard lock, so a
        // count of one here means nobody is queued behind us.
        self.table
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Manager for store write serialization and per-coupon locks.
pub struct LockManager {
    write_lock: Mutex<()>,
    coupon_locks: Arc<CouponLockTable>,
    config: LockConfig,
}

impl LockManager {
    /// Create a new lock manager.
    pub fn new(config: LockConfig) -> Self {
        Self {
            write_lock: Mutex::new(()),
            coupon_locks: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Serialize a snapshot read-modify-write.
    pub async fn write(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Take the lock for one coupon, waiting up to the configured timeout.
    pub async fn lock_coupon(&self, id: CouponId) -> Result<CouponGuard> {
        let lock = self
            .coupon_locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = match lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(coupon_id = %id, "Waiting for coupon lock");
                tokio::time::timeout(self.config.coupon_wait_timeout, lock.lock_owned())
                    .await
                    .map_err(|_| {
                        warn!(coupon_id = %id, "Timed out waiting for coupon lock");
                        CouponError::InvalidState {
                            id,
                            status: CouponStatus::Pending,
                            message: "another operation on this coupon is still in progress"
                                .to_string(),
                        }
                    })?
            }
        };

        Ok(CouponGuard {
            id,
            guard: Some(guard),
            table: self.coupon_locks.clone(),
        })
    }

    /// Number of coupons currently locked or awaited.
    pub fn active_coupon_locks(&self) -> usize {
        self.coupon_locks.len()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}
