//! Coupon record and its status machine.

use crate::{CouponCode, CouponId, LedgerAddress, Timestamp, TokenAmount, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a coupon description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Coupon status representing the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    /// Issued and redeemable.
    Pending,
    /// Tokens delivered (or marked delivered by an administrator). Terminal.
    Redeemed,
    /// Withdrawn by an administrator; may be reopened.
    Cancelled,
}

impl CouponStatus {
    /// All statuses, in display order.
    pub const ALL: [CouponStatus; 3] = [
        CouponStatus::Pending,
        CouponStatus::Redeemed,
        CouponStatus::Cancelled,
    ];

    /// Check if this is a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CouponStatus::Redeemed)
    }

    /// Check if a coupon in this state may be deleted.
    pub fn can_delete(&self) -> bool {
        matches!(self, CouponStatus::Pending | CouponStatus::Cancelled)
    }

    /// Get valid next states from current state.
    pub fn valid_transitions(&self) -> &[CouponStatus] {
        match self {
            CouponStatus::Pending => &[CouponStatus::Cancelled, CouponStatus::Redeemed],
            CouponStatus::Cancelled => &[CouponStatus::Pending, CouponStatus::Redeemed],
            CouponStatus::Redeemed => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: CouponStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Pending => "pending",
            CouponStatus::Redeemed => "redeemed",
            CouponStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CouponStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CouponStatus::Pending),
            "redeemed" => Ok(CouponStatus::Redeemed),
            "cancelled" => Ok(CouponStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown status '{}', expected one of: pending, redeemed, cancelled",
            self.0
        )
    }
}

impl std::error::Error for UnknownStatus {}

/// An off-chain voucher redeemable for a fixed token amount.
///
/// `redeemed_at`, `redeemed_by` and `transaction_hash` are written together by
/// [`Coupon::redeem`]. The administrative override ([`Coupon::mark_redeemed_manually`])
/// only records `redeemed_at`, since no transfer took place.
///
/// Records written before `updatedAt` existed read back with `updated_at`
/// equal to `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredCoupon")]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Display label.
    pub code: CouponCode,
    /// Tokens delivered on redemption.
    pub value: TokenAmount,
    /// Intended recipient, if known at issue time.
    pub recipient_address: Option<LedgerAddress>,
    /// Free text, at most [`MAX_DESCRIPTION_LEN`] characters.
    pub description: Option<String>,
    /// Current status.
    pub status: CouponStatus,
    /// When the coupon was issued.
    pub created_at: Timestamp,
    /// When the record last changed.
    pub updated_at: Timestamp,
    pub redeemed_at: Option<Timestamp>,
    pub redeemed_by: Option<LedgerAddress>,
    pub transaction_hash: Option<TxHash>,
}

/// On-disk coupon record, tolerant of fields older files lack.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCoupon {
    id: CouponId,
    code: CouponCode,
    value: TokenAmount,
    #[serde(default)]
    recipient_address: Option<LedgerAddress>,
    #[serde(default)]
    description: Option<String>,
    status: CouponStatus,
    created_at: Timestamp,
    #[serde(default)]
    updated_at: Option<Timestamp>,
    #[serde(default)]
    redeemed_at: Option<Timestamp>,
    #[serde(default)]
    redeemed_by: Option<LedgerAddress>,
    #[serde(default)]
    transaction_hash: Option<TxHash>,
}

impl From<StoredCoupon> for Coupon {
    fn from(stored: StoredCoupon) -> Self {
        Self {
            id: stored.id,
            code: stored.code,
            value: stored.value,
            recipient_address: stored.recipient_address,
            description: stored.description,
            status: stored.status,
            created_at: stored.created_at,
            updated_at: stored.updated_at.unwrap_or(stored.created_at),
            redeemed_at: stored.redeemed_at,
            redeemed_by: stored.redeemed_by,
            transaction_hash: stored.transaction_hash,
        }
    }
}

impl Coupon {
    /// Create a new pending coupon.
    pub fn new_pending(
        code: CouponCode,
        value: TokenAmount,
        recipient_address: Option<LedgerAddress>,
        description: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: CouponId::new(),
            code,
            value,
            recipient_address,
            description,
            status: CouponStatus::Pending,
            created_at,
            updated_at: created_at,
            redeemed_at: None,
            redeemed_by: None,
            transaction_hash: None,
        }
    }

    /// Check if the coupon can still be redeemed.
    pub fn is_pending(&self) -> bool {
        self.status == CouponStatus::Pending
    }

    /// Move between `pending` and `cancelled`.
    pub fn transition_to(
        &mut self,
        new_status: CouponStatus,
        at: Timestamp,
    ) -> Result<(), InvalidTransition> {
        if new_status == CouponStatus::Redeemed || !self.status.can_transition_to(new_status) {
            return Err(InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        self.status = new_status;
        self.updated_at = at;
        Ok(())
    }

    /// Record a confirmed ledger transfer.
    pub fn redeem(
        &mut self,
        redeemed_by: LedgerAddress,
        transaction_hash: TxHash,
        at: Timestamp,
    ) -> Result<(), InvalidTransition> {
        if !self.is_pending() {
            return Err(InvalidTransition {
                from: self.status,
                to: CouponStatus::Redeemed,
            });
        }

        self.status = CouponStatus::Redeemed;
        self.redeemed_at = Some(at);
        self.redeemed_by = Some(redeemed_by);
        self.transaction_hash = Some(transaction_hash);
        self.updated_at = at;
        Ok(())
    }

    /// Administrative override: mark redeemed without moving any tokens.
    ///
    /// Used for manual reconciliation, e.g. after a transfer that settled on
    /// the ledger but whose local update was lost.
    pub fn mark_redeemed_manually(&mut self, at: Timestamp) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(CouponStatus::Redeemed) {
            return Err(InvalidTransition {
                from: self.status,
                to: CouponStatus::Redeemed,
            });
        }

        self.status = CouponStatus::Redeemed;
        self.redeemed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Whether this coupon went through a ledger transfer.
    pub fn has_transfer(&self) -> bool {
        self.transaction_hash.is_some()
    }

    /// Check the redemption-field invariant.
    pub fn redemption_fields_consistent(&self) -> bool {
        match (
            self.status,
            &self.redeemed_at,
            &self.redeemed_by,
            &self.transaction_hash,
        ) {
            (CouponStatus::Redeemed, Some(_), Some(_), Some(_)) => true,
            (CouponStatus::Redeemed, Some(_), None, None) => true,
            (CouponStatus::Pending | CouponStatus::Cancelled, None, None, None) => true,
            _ => false,
        }
    }
}

/// Error when attempting invalid state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: CouponStatus,
    pub to: CouponStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid state transition from {} to {}",
            self.from, self.to
        )
    }
}

impl std::error::Error for InvalidTransition {}
