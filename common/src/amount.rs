//! Token amounts at fixed 18-digit precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits every stored amount carries.
pub const TOKEN_SCALE: u32 = 18;

/// Largest decimal scale a ledger may report that still fits `u128` arithmetic.
pub const MAX_LEDGER_DECIMALS: u32 = 38;

/// `10^TOKEN_SCALE`, the number of atto-units in one whole token.
const ATTO_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Largest mantissa a `Decimal` can hold (2^96 - 1).
const MAX_MANTISSA: u128 = 79_228_162_514_264_337_593_543_950_335;

/// Errors produced while building or converting token amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Amount is below zero.
    #[error("Amount cannot be negative: {0}")]
    Negative(String),

    /// Amount does not fit alongside 18 fractional digits, or a conversion overflowed.
    #[error("Amount out of range: {0}")]
    Overflow(String),

    /// Amount carries more fractional digits than the target scale.
    #[error("Amount {value} is not representable with {decimals} decimals")]
    Precision { value: String, decimals: u32 },

    /// Ledger reported a scale this service cannot work with.
    #[error("Unsupported token decimals: {0}")]
    UnsupportedDecimals(u32),

    /// Text could not be parsed as a decimal.
    #[error("Invalid amount: {0}")]
    Parse(String),
}

/// A non-negative quantity of tokens stored at exactly 18 fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TokenAmount(Decimal);

impl TokenAmount {
    /// The zero amount.
    pub fn zero() -> Self {
        let mut value = Decimal::ZERO;
        value.rescale(TOKEN_SCALE);
        Self(value)
    }

    /// Round `value` to 18 fractional digits (midpoint away from zero).
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value.to_string()));
        }

        let rounded =
            value.round_dp_with_strategy(TOKEN_SCALE, RoundingStrategy::MidpointAwayFromZero);
        let mut scaled = rounded;
        scaled.rescale(TOKEN_SCALE);

        if scaled.scale() != TOKEN_SCALE || scaled != rounded {
            return Err(AmountError::Overflow(value.to_string()));
        }

        Ok(Self(scaled))
    }

    /// Build from a count of atto-units (`10^-18` tokens).
    pub fn from_atto_units(units: u128) -> Result<Self, AmountError> {
        if units > MAX_MANTISSA {
            return Err(AmountError::Overflow(units.to_string()));
        }
        // Bounded by MAX_MANTISSA above, so the cast cannot wrap.
        let value = Decimal::try_from_i128_with_scale(units as i128, TOKEN_SCALE)
            .map_err(|e| AmountError::Overflow(e.to_string()))?;
        Ok(Self(value))
    }

    /// Get the underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Check if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The amount expressed in atto-units.
    pub fn atto_units(&self) -> u128 {
        // Scale is pinned to TOKEN_SCALE and the value is never negative.
        u128::try_from(self.0.mantissa()).unwrap_or_default()
    }

    /// Convert to ledger base units for a token with `decimals` fractional digits.
    pub fn to_base_units(&self, decimals: u32) -> Result<u128, AmountError> {
        if decimals > MAX_LEDGER_DECIMALS {
            return Err(AmountError::UnsupportedDecimals(decimals));
        }

        let atto = self.atto_units();
        if decimals >= TOKEN_SCALE {
            atto.checked_mul(10u128.pow(decimals - TOKEN_SCALE))
                .ok_or_else(|| AmountError::Overflow(self.to_string()))
        } else {
            let divisor = 10u128.pow(TOKEN_SCALE - decimals);
            if atto % divisor != 0 {
                return Err(AmountError::Precision {
                    value: self.to_string(),
                    decimals,
                });
            }
            Ok(atto / divisor)
        }
    }

    /// Build from ledger base units of a token with `decimals` fractional digits.
    pub fn from_base_units(units: u128, decimals: u32) -> Result<Self, AmountError> {
        if decimals > MAX_LEDGER_DECIMALS {
            return Err(AmountError::UnsupportedDecimals(decimals));
        }

        let atto = if decimals >= TOKEN_SCALE {
            let divisor = 10u128.pow(decimals - TOKEN_SCALE);
            if units % divisor != 0 {
                return Err(AmountError::Precision {
                    value: units.to_string(),
                    decimals: TOKEN_SCALE,
                });
            }
            units / divisor
        } else {
            units
                .checked_mul(10u128.pow(TOKEN_SCALE - decimals))
                .ok_or_else(|| AmountError::Overflow(units.to_string()))?
        };

        Self::from_atto_units(atto)
    }
}

impl Default for TokenAmount {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map_err(|e| AmountError::Parse(format!("{s}: {e}")))?;
        Self::from_decimal(value)
    }
}

impl TryFrom<Decimal> for TokenAmount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl From<TokenAmount> for Decimal {
    fn from(amount: TokenAmount) -> Self {
        amount.0
    }
}

/// Fixed-point accumulator for summing many amounts without precision loss.
///
/// Sums are kept in atto-units, so the total can exceed what a single
/// `TokenAmount` holds while still formatting to 18 fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct AmountSum(u128);

impl AmountSum {
    /// An empty sum.
    pub fn new() -> Self {
        Self(0)
    }

    /// Add an amount, failing on `u128` overflow.
    pub fn checked_add(self, amount: &TokenAmount) -> Option<Self> {
        self.0.checked_add(amount.atto_units()).map(Self)
    }

    /// Total in atto-units.
    pub fn atto_units(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for AmountSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:018}",
            self.0 / ATTO_PER_TOKEN,
            self.0 % ATTO_PER_TOKEN
        )
    }
}

impl Serialize for AmountSum {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_is_stored_at_eighteen_digits() {
        let amount = TokenAmount::from_decimal(dec!(10)).unwrap();
        assert_eq!(amount.to_string(), "10.000000000000000000");
        assert_eq!(amount.value().scale(), TOKEN_SCALE);
    }

    #[test]
    fn test_amount_rounds_extra_digits() {
        let amount: TokenAmount = "0.0000000000000000015".parse().unwrap();
        assert_eq!(amount.to_string(), "0.000000000000000002");
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(matches!(
            TokenAmount::from_decimal(dec!(-1)),
            Err(AmountError::Negative(_))
        ));
    }

    #[test]
    fn test_amount_too_large_for_scale() {
        assert!(matches!(
            TokenAmount::from_decimal(dec!(100000000000)),
            Err(AmountError::Overflow(_))
        ));
        assert!(TokenAmount::from_decimal(dec!(79228162514)).is_ok());
    }

    #[test]
    fn test_base_unit_conversion() {
        let amount = TokenAmount::from_decimal(dec!(1.5)).unwrap();
        assert_eq!(amount.to_base_units(18).unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(amount.to_base_units(6).unwrap(), 1_500_000);
        assert_eq!(amount.to_base_units(0).unwrap_err(), AmountError::Precision {
            value: amount.to_string(),
            decimals: 0,
        });
        assert_eq!(amount.to_base_units(20).unwrap(), 150_000_000_000_000_000_000);
        assert!(matches!(
            amount.to_base_units(39),
            Err(AmountError::UnsupportedDecimals(39))
        ));
    }

    #[test]
    fn test_base_unit_overflow() {
        let amount = TokenAmount::from_decimal(dec!(79228162514)).unwrap();
        assert!(matches!(
            amount.to_base_units(38),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_from_base_units() {
        let amount = TokenAmount::from_base_units(2_500_000, 6).unwrap();
        assert_eq!(amount.to_string(), "2.500000000000000000");
    }

    #[test]
    fn test_serde_preserves_precision() {
        let amount: TokenAmount = "0.123456789012345678".parse().unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"0.123456789012345678\"");
        let back: TokenAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn test_amount_sum_formatting() {
        let ten = TokenAmount::from_decimal(dec!(10)).unwrap();
        let sum = AmountSum::new()
            .checked_add(&ten)
            .and_then(|s| s.checked_add(&ten))
            .and_then(|s| s.checked_add(&ten))
            .unwrap();
        assert_eq!(sum.to_string(), "30.000000000000000000");
        assert_eq!(AmountSum::new().to_string(), "0.000000000000000000");
    }

    proptest! {
        #[test]
        fn prop_base_units_round_trip(units in 0u128..=10_000_000_000u128, decimals in 0u32..=18) {
            let amount = TokenAmount::from_base_units(units, decimals).unwrap();
            prop_assert_eq!(amount.to_base_units(decimals).unwrap(), units);
        }

        #[test]
        fn prop_sum_matches_decimal_sum(values in proptest::collection::vec(1u64..1_000_000_000, 1..50)) {
            let mut sum = AmountSum::new();
            let mut expected = Decimal::ZERO;
            for v in &values {
                let value = Decimal::new(*v as i64, 6);
                expected += value;
                sum = sum.checked_add(&TokenAmount::from_decimal(value).unwrap()).unwrap();
            }
            prop_assert_eq!(sum.to_string(), TokenAmount::from_decimal(expected).unwrap().to_string());
        }
    }
}
