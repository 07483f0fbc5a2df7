//! Lossless money type backed by rust_decimal.
//!
//! Provides canonical parsing from strings, formatting without exponent
//! notation, and the currency rounding used by the commission split.

use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minor-unit precision for settled amounts (agorot / cents).
pub const CURRENCY_SCALE: u32 = 2;

/// Lossless decimal numeric type for money.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to a JSON string so clients never round-trip through f64.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::str")] RustDecimal);

impl Decimal {
    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Format with exactly two fractional digits, e.g. `"150.00"`.
    pub fn to_currency_string(&self) -> String {
        format!("{:.2}", self.round_currency().0)
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Returns the value 100.
    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    /// Convert a percentage (e.g. `15`) into a rate (`0.15`).
    pub fn percent_to_rate(self) -> Self {
        self / Self::hundred()
    }

    /// Round to currency precision, midpoint away from zero.
    pub fn round_currency(&self) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<u8> for Decimal {
    fn from(value: u8) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_canonical_drops_trailing_zeros() {
        let decimal = Decimal::from_str_canonical("150.00").unwrap();
        assert_eq!(decimal.to_canonical_string(), "150");
        assert!(!decimal.to_canonical_string().contains('e'));
    }

    #[test]
    fn test_currency_string_pads_to_two_places() {
        let decimal = Decimal::from_str_canonical("50").unwrap();
        assert_eq!(decimal.to_currency_string(), "50.00");

        let decimal = Decimal::from_str_canonical("0.125").unwrap();
        assert_eq!(decimal.to_currency_string(), "0.13");
    }

    #[test]
    fn test_round_currency_midpoint_away_from_zero() {
        let d = Decimal::from_str_canonical("2.345").unwrap();
        assert_eq!(d.round_currency(), Decimal::from_str_canonical("2.35").unwrap());

        let d = Decimal::from_str_canonical("2.344").unwrap();
        assert_eq!(d.round_currency(), Decimal::from_str_canonical("2.34").unwrap());
    }

    #[test]
    fn test_percent_to_rate() {
        let pct = Decimal::from(15u8);
        assert_eq!(
            pct.percent_to_rate(),
            Decimal::from_str_canonical("0.15").unwrap()
        );
    }

    #[test]
    fn test_scale_does_not_affect_equality() {
        let a = Decimal::from_str_canonical("50").unwrap();
        let b = Decimal::from_str_canonical("50.00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decimal_json_serialization_is_string() {
        let decimal = Decimal::from_str_canonical("123.45").unwrap();
        let json = serde_json::to_value(decimal).unwrap();
        assert!(json.is_string());
        assert_eq!(json, serde_json::json!("123.45"));

        let back: Decimal = serde_json::from_value(json).unwrap();
        assert_eq!(back, decimal);
    }

    #[test]
    fn test_sign_predicates() {
        assert!(Decimal::from(-3i64).is_negative());
        assert!(Decimal::from(3i64).is_positive());
        assert!(Decimal::zero().is_zero());
        assert!(!Decimal::zero().is_negative());
    }
}
