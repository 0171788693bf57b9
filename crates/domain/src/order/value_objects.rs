//! Value objects for the order domain.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Money amount in minor currency units (cents) to avoid floating point drift.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts a decimal amount in major units to cents.
    ///
    /// Rounds half to even at the cent boundary, so `10.005` becomes
    /// `1000` and `10.015` becomes `1002`. Returns None if the result does
    /// not fit in cents.
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
            .checked_mul(Decimal::from(100))?
            .to_i64()
            .map(Self::from_cents)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount in major units, e.g. `17500` cents as `175.00`.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Adds another amount, returning None on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Multiplies by a quantity, returning None on overflow.
    pub fn checked_mul(&self, quantity: i32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// A line of an order, frozen when the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_ref: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Money,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_from_decimal_exact() {
        assert_eq!(Money::from_decimal(dec("175.00")), Some(Money::from_cents(17500)));
        assert_eq!(Money::from_decimal(dec("0.1")), Some(Money::from_cents(10)));
    }

    #[test]
    fn test_from_decimal_rounds_half_to_even() {
        assert_eq!(Money::from_decimal(dec("10.005")), Some(Money::from_cents(1000)));
        assert_eq!(Money::from_decimal(dec("10.015")), Some(Money::from_cents(1002)));
        assert_eq!(Money::from_decimal(dec("10.0051")), Some(Money::from_cents(1001)));
        assert_eq!(Money::from_decimal(dec("-2.345")), Some(Money::from_cents(-234)));
    }

    #[test]
    fn test_from_decimal_overflow() {
        assert_eq!(Money::from_decimal(Decimal::MAX), None);
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(Money::from_cents(17500).to_decimal(), dec("175.00"));
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Money::from_cents(5000);
        assert_eq!(price.checked_mul(2), Some(Money::from_cents(10000)));
        assert_eq!(
            price.checked_add(Money::from_cents(7500)),
            Some(Money::from_cents(12500))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_mul(2), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(price), None);
    }
}
