//! Ledger address validation.

use coupon_common::LedgerAddress;

/// Decides whether a caller-supplied string is a usable ledger address.
pub trait AddressValidator: Send + Sync {
    /// Check the candidate address.
    fn is_valid_address(&self, candidate: &str) -> bool;
}

/// Syntactic validator for EVM-style `0x` + 40 hex digit addresses.
///
/// Mixed-case checksums (EIP-55) are not verified.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvmAddressValidator {
    /// Reject the all-zero address.
    pub reject_zero: bool,
}

impl EvmAddressValidator {
    /// Create a validator that also rejects the zero address.
    pub fn strict() -> Self {
        Self { reject_zero: true }
    }
}

impl AddressValidator for EvmAddressValidator {
    fn is_valid_address(&self, candidate: &str) -> bool {
        if !LedgerAddress::is_well_formed(candidate) {
            return false;
        }
        !(self.reject_zero && candidate[2..].chars().all(|c| c == '0'))
    }
}
