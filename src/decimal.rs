use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Monetary amount with exact decimal arithmetic. Rounding to a currency's
/// scale happens only when an amount enters the engine through
/// [`Currency::of`]; arithmetic on already-scoped amounts is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d)
    }

    /// create from integer amount in major units (dollars, euros, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// check if strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// check if strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// minimum of two values
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// maximum of two values
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Money(Decimal::from_str(s)?))
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

/// Currency descriptor for a loan. Every amount flowing through the engine
/// belongs to the single currency of the loan being processed; amounts are
/// rounded to the currency's scale on entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    code: String,
    decimal_places: u32,
}

impl Currency {
    pub fn new(code: impl Into<String>, decimal_places: u32) -> Self {
        Self {
            code: code.into(),
            decimal_places,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn decimal_places(&self) -> u32 {
        self.decimal_places
    }

    /// scope a raw decimal to this currency, rounding to its scale
    pub fn of(&self, amount: Decimal) -> Money {
        Money(amount.round_dp(self.decimal_places))
    }

    /// round an existing amount to this currency's scale
    pub fn round(&self, amount: Money) -> Money {
        Money(amount.0.round_dp(self.decimal_places))
    }

    pub fn zero(&self) -> Money {
        Money::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_scoping_rounds_to_scale() {
        let usd = Currency::new("USD", 2);
        assert_eq!(usd.of(dec!(100.125)).to_string(), "100.12");
        assert_eq!(usd.of(dec!(100.135)).to_string(), "100.14");

        let jpy = Currency::new("JPY", 0);
        assert_eq!(jpy.of(dec!(100.5)).to_string(), "100");
    }

    #[test]
    fn test_arithmetic_is_exact() {
        let a = Money::from_decimal(dec!(0.10));
        let b = Money::from_decimal(dec!(0.20));
        assert_eq!(a + b, Money::from_decimal(dec!(0.30)));
        assert_eq!(b - a, a);

        let mut acc = Money::ZERO;
        acc += Money::from_major(7);
        acc -= Money::from_major(2);
        assert_eq!(acc, Money::from_major(5));
    }

    #[test]
    fn test_sign_predicates() {
        assert!(Money::ZERO.is_zero());
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
        assert!(Money::from_major(1).is_positive());
        assert!((Money::ZERO - Money::from_major(1)).is_negative());
    }
}
