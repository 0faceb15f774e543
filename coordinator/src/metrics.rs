//! Metrics collection for coupon operations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Service counters.
#[derive(Default)]
pub struct Metrics {
    /// Coupons issued.
    pub coupons_created: AtomicU64,
    /// Batches issued.
    pub batches_created: AtomicU64,
    /// Successful record updates.
    pub coupons_updated: AtomicU64,
    /// Coupons deleted.
    pub coupons_deleted: AtomicU64,
    /// Redemptions started.
    pub redemptions_attempted: AtomicU64,
    /// Redemptions confirmed and recorded.
    pub redemptions_succeeded: AtomicU64,
    /// Redemptions rejected or failed with no tokens moved.
    pub redemptions_failed: AtomicU64,
    /// Redemptions that need manual reconciliation.
    pub reconciliation_required: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issued batch.
    pub fn batch_created(&self, size: usize) {
        self.batches_created.fetch_add(1, Ordering::Relaxed);
        self.coupons_created.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record a record update.
    pub fn coupon_updated(&self) {
        self.coupons_updated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deletion.
    pub fn coupon_deleted(&self) {
        self.coupons_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a redemption attempt.
    pub fn redemption_attempted(&self) {
        self.redemptions_attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful redemption.
    pub fn redemption_succeeded(&self) {
        self.redemptions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a redemption that moved no tokens.
    pub fn redemption_failed(&self) {
        self.redemptions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a redemption needing reconciliation.
    pub fn reconciliation_needed(&self) {
        self.reconciliation_required.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            coupons_created: self.coupons_created.load(Ordering::Relaxed),
            batches_created: self.batches_created.load(Ordering::Relaxed),
            coupons_updated: self.coupons_updated.load(Ordering::Relaxed),
            coupons_deleted: self.coupons_deleted.load(Ordering::Relaxed),
            redemptions_attempted: self.redemptions_attempted.load(Ordering::Relaxed),
            redemptions_succeeded: self.redemptions_succeeded.load(Ordering::Relaxed),
            redemptions_failed: self.redemptions_failed.load(Ordering::Relaxed),
            reconciliation_required: self.reconciliation_required.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub coupons_created: u64,
    pub batches_created: u64,
    pub coupons_updated: u64,
    pub coupons_deleted: u64,
    pub redemptions_attempted: u64,
    pub redemptions_succeeded: u64,
    pub redemptions_failed: u64,
    pub reconciliation_required: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot() {
        let metrics = Metrics::new();
        metrics.batch_created(3);
        metrics.redemption_attempted();
        metrics.redemption_succeeded();
        metrics.redemption_attempted();
        metrics.reconciliation_needed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.coupons_created, 3);
        assert_eq!(snapshot.batches_created, 1);
        assert_eq!(snapshot.redemptions_attempted, 2);
        assert_eq!(snapshot.redemptions_succeeded, 1);
        assert_eq!(snapshot.reconciliation_required, 1);
    }
}
