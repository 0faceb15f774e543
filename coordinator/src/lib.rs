//! Luxae Coupons Coordinator
//!
//! Issues coupons, applies administrative changes and redeems coupons for
//! on-ledger token transfers, guaranteeing at most one successful transfer
//! per coupon.

pub mod config;
pub mod lifecycle;
pub mod lock_manager;
pub mod metrics;
pub mod redemption;
pub mod service;

pub use config::CoordinatorConfig;
pub use lifecycle::{CouponStats, CouponUpdate, CreateBatchRequest, LifecycleManager};
pub use lock_manager::LockManager;
pub use metrics::{Metrics, MetricsSnapshot};
pub use redemption::{RedemptionCoordinator, RedemptionOutcome};
pub use service::{BalanceReport, CouponService, TokenSummary};
